//! Integration tests for attachments saved and deleted inside a unit of work.

mod common;

use common::{image, setup};
use rstest::rstest;
use stowage_core::{AttachmentModel, TransactionState};
use stowage_db::{UnitOfWork, User};

fn avatar_name(user: &User) -> String {
    user.avatar()
        .expect("avatar set")
        .name()
        .to_string()
}

#[tokio::test]
async fn test_replace_commits_then_deletes_old_file() {
    let ctx = setup().await;
    let mut user = User::new("alice");
    user.set_avatar(image("old.png"));
    ctx.users.save(&mut user).await.expect("Failed to save user");
    let old = avatar_name(&user);

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    user.set_avatar(image("new.png"));
    ctx.users
        .save_in(&uow, &mut user)
        .await
        .expect("Failed to update user");
    let new = avatar_name(&user);

    // Both files exist until the outcome is known
    assert!(ctx.exists(&old).await);
    assert!(ctx.exists(&new).await);

    uow.commit().await.expect("Failed to commit");

    assert!(!ctx.exists(&old).await);
    assert!(ctx.exists(&new).await);
    assert!(!user.attachments().is_dirty());
}

#[tokio::test]
async fn test_replace_rolls_back_to_old_file() {
    let ctx = setup().await;
    let mut user = User::new("alice");
    user.set_avatar(image("old.png"));
    ctx.users.save(&mut user).await.expect("Failed to save user");
    let old = avatar_name(&user);

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    user.set_avatar(image("new.png"));
    ctx.users
        .save_in(&uow, &mut user)
        .await
        .expect("Failed to update user");
    let new = avatar_name(&user);

    uow.rollback().await.expect("Failed to roll back");

    assert!(ctx.exists(&old).await);
    assert!(!ctx.exists(&new).await);
    assert_eq!(avatar_name(&user), old);

    let found = ctx
        .users
        .find_by_id(user.id())
        .await
        .expect("Failed to find user")
        .expect("User should exist");
    assert_eq!(avatar_name(&found), old);
}

#[rstest]
#[case::commit(true)]
#[case::rollback(false)]
#[tokio::test]
async fn test_two_replacements_in_one_unit_of_work(#[case] commit: bool) {
    let ctx = setup().await;
    let mut user = User::new("alice");
    user.set_avatar(image("a.png"));
    ctx.users.save(&mut user).await.expect("Failed to save user");
    let a = avatar_name(&user);

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    user.set_avatar(image("b.png"));
    ctx.users.save_in(&uow, &mut user).await.expect("save B");
    let b = avatar_name(&user);
    user.set_avatar(image("c.png"));
    ctx.users.save_in(&uow, &mut user).await.expect("save C");
    let c = avatar_name(&user);

    if commit {
        uow.commit().await.expect("Failed to commit");
        assert!(!ctx.exists(&a).await);
        assert!(!ctx.exists(&b).await);
        assert!(ctx.exists(&c).await);
    } else {
        uow.rollback().await.expect("Failed to roll back");
        assert!(ctx.exists(&a).await);
        assert!(!ctx.exists(&b).await);
        assert!(!ctx.exists(&c).await);
    }
}

#[rstest]
#[case::commit(true)]
#[case::rollback(false)]
#[tokio::test]
async fn test_delete_in_unit_of_work(#[case] commit: bool) {
    let ctx = setup().await;
    let mut user = User::new("alice");
    user.set_avatar(image("me.png"));
    ctx.users.save(&mut user).await.expect("Failed to save user");
    let name = avatar_name(&user);

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    ctx.users
        .delete_in(&uow, &user)
        .await
        .expect("Failed to delete user");
    assert!(ctx.exists(&name).await);

    if commit {
        uow.commit().await.expect("Failed to commit");
        assert!(!ctx.exists(&name).await);
    } else {
        uow.rollback().await.expect("Failed to roll back");
        assert!(ctx.exists(&name).await);
        let found = ctx
            .users
            .find_by_id(user.id())
            .await
            .expect("Failed to find user");
        assert!(found.is_some());
    }
}

#[tokio::test]
async fn test_create_rolled_back_leaves_no_file() {
    let ctx = setup().await;

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    let mut user = User::new("alice");
    user.set_photos(vec![image("a.jpg"), image("b.jpg")]);
    ctx.users
        .save_in(&uow, &mut user)
        .await
        .expect("Failed to save user");
    let photos = user.photos();

    let inside = ctx
        .users
        .find_by_id_in(&uow, user.id())
        .await
        .expect("Failed to find user");
    assert!(inside.is_some());

    uow.rollback().await.expect("Failed to roll back");

    for photo in &photos {
        assert!(!ctx.exists(photo.name()).await);
    }
    assert!(
        ctx.users
            .find_by_id(user.id())
            .await
            .expect("Failed to query")
            .is_none()
    );
}

#[tokio::test]
async fn test_released_savepoint_follows_outer_rollback() {
    let ctx = setup().await;

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    let savepoint = uow.savepoint().await.expect("Failed to open savepoint");
    let mut user = User::new("alice");
    user.set_avatar(image("me.png"));
    ctx.users
        .save_in(&savepoint, &mut user)
        .await
        .expect("Failed to save user");
    let name = avatar_name(&user);

    savepoint.commit().await.expect("Failed to release savepoint");
    assert!(ctx.exists(&name).await);
    assert_eq!(uow.hooks().pending_hooks(), (1, 1));

    uow.rollback().await.expect("Failed to roll back");
    assert!(!ctx.exists(&name).await);
}

#[tokio::test]
async fn test_savepoint_rollback_is_immediate() {
    let ctx = setup().await;
    let mut user = User::new("alice");
    user.set_avatar(image("old.png"));
    ctx.users.save(&mut user).await.expect("Failed to save user");
    let old = avatar_name(&user);

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    let savepoint = uow.savepoint().await.expect("Failed to open savepoint");
    user.set_avatar(image("new.png"));
    ctx.users
        .save_in(&savepoint, &mut user)
        .await
        .expect("Failed to update user");
    let new = avatar_name(&user);

    savepoint.rollback().await.expect("Failed to roll back savepoint");
    assert!(!ctx.exists(&new).await);
    assert!(ctx.exists(&old).await);
    assert_eq!(uow.hooks().state(), TransactionState::Active);

    uow.commit().await.expect("Failed to commit");
    assert!(ctx.exists(&old).await);
    assert_eq!(avatar_name(&user), old);
}

#[tokio::test]
async fn test_savepoint_rollback_then_outer_save_deletes_superseded_files() {
    let ctx = setup().await;
    let mut user = User::new("alice");
    user.set_avatar(image("a.png"));
    ctx.users.save(&mut user).await.expect("Failed to save user");
    let a = avatar_name(&user);

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    user.set_avatar(image("b.png"));
    ctx.users.save_in(&uow, &mut user).await.expect("save B");
    let b = avatar_name(&user);

    let savepoint = uow.savepoint().await.expect("Failed to open savepoint");
    user.set_avatar(image("c.png"));
    ctx.users
        .save_in(&savepoint, &mut user)
        .await
        .expect("save C");
    let c = avatar_name(&user);
    savepoint.rollback().await.expect("Failed to roll back savepoint");

    assert!(!ctx.exists(&c).await);
    assert_eq!(avatar_name(&user), b);

    user.set_avatar(image("d.png"));
    ctx.users.save_in(&uow, &mut user).await.expect("save D");
    let d = avatar_name(&user);
    uow.commit().await.expect("Failed to commit");

    assert!(!ctx.exists(&a).await);
    assert!(!ctx.exists(&b).await);
    assert!(ctx.exists(&d).await);

    let found = ctx
        .users
        .find_by_id(user.id())
        .await
        .expect("Failed to find user")
        .expect("User should exist");
    assert_eq!(avatar_name(&found), d);
}

#[tokio::test]
async fn test_retry_after_rolled_back_insert_inserts_again() {
    let ctx = setup().await;

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    let mut user = User::new("alice");
    user.set_avatar(image("me.png"));
    ctx.users
        .save_in(&uow, &mut user)
        .await
        .expect("Failed to save user");
    assert!(user.is_persisted());

    uow.rollback().await.expect("Failed to roll back");
    assert!(!user.is_persisted());

    user.set_avatar(image("me.png"));
    ctx.users.save(&mut user).await.expect("Retry should insert");

    let found = ctx
        .users
        .find_by_id(user.id())
        .await
        .expect("Failed to find user")
        .expect("User should exist");
    let name = avatar_name(&found);
    assert!(ctx.exists(&name).await);
}

#[tokio::test]
async fn test_committed_insert_stays_persisted() {
    let ctx = setup().await;

    let uow = UnitOfWork::begin(&ctx.db).await.expect("Failed to begin");
    let mut user = User::new("alice");
    ctx.users
        .save_in(&uow, &mut user)
        .await
        .expect("Failed to save user");
    uow.commit().await.expect("Failed to commit");

    assert!(user.is_persisted());
    user.set_username("alicia");
    ctx.users.save(&mut user).await.expect("Failed to update user");
}
