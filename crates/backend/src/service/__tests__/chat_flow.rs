//! Integration tests for the chat read and write paths.
//!
//! These tests drive `ChatService` end to end against a temporary store.

#[cfg(test)]
mod tests {
  use std::fs;

  use pretty_assertions::assert_eq;
  use timble_core::Channel;

  use crate::{
    service::{
      __tests__::helpers::{MirrorScript, TestContext},
      chat::SubmitRequest,
      util::ServiceError,
    },
    sync::PullOutcome,
  };

  const OLD: i64 = 1_000_000;

  fn general() -> Channel {
    Channel::named("general").unwrap()
  }

  /// A submitted message appears at the front of its channel.
  #[tokio::test]
  async fn test_submit_then_aggregate() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: old-1\nfirst", OLD);
    ctx.write_file("general", "b.txt", "Author: old-2\nsecond", OLD + 10);

    let receipt = ctx
      .service
      .submit_message("general", "alice", "fresh news", &["news".to_string()])
      .await
      .unwrap();

    let page = ctx.service.aggregate_page(&general(), 50, 300).await.unwrap();
    assert_eq!(page.total_shown, 3);
    let first = &page.messages[0];
    assert_eq!(first.author, "alice");
    assert_eq!(first.body, "fresh news\n\nTags: #news");
    assert_eq!(first.message_id, receipt.message_id);
    assert_eq!(first.hashtags, vec!["#news"]);
    assert_eq!(page.messages[1].author, "old-2");
  }

  /// The pseudo-channel is the union of all channels by recency, truncated.
  #[tokio::test]
  async fn test_everything_is_union_by_recency() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: a\nhi", OLD);
    ctx.write_file("random", "b.txt", "Author: b\nhi", OLD + 30);
    ctx.write_file("dev", "c.txt", "Author: c\nhi", OLD + 20);
    ctx.write_file("random", "d.txt", "Author: d\nhi", OLD + 10);

    let page = ctx.service.aggregate_page(&Channel::All, 3, 300).await.unwrap();
    let authors: Vec<_> = page.messages.iter().map(|m| m.author.as_str()).collect();
    assert_eq!(authors, vec!["b", "c", "d"]);
    assert_eq!(page.channel, Channel::All);
  }

  #[tokio::test]
  async fn test_page_truncation() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: a\nhello world", OLD);
    ctx.write_file("general", "b.txt", "Author: b\nhello", OLD + 1);

    let page = ctx.service.aggregate_page(&general(), 50, 10).await.unwrap();
    assert_eq!(page.messages[0].truncated_body, "hello");
    assert!(!page.messages[0].is_truncated);
    assert_eq!(page.messages[1].truncated_body, "hello worl...");
    assert!(page.messages[1].is_truncated);
    assert_eq!(page.messages[1].body, "hello world");
  }

  #[tokio::test]
  async fn test_zero_limit_is_empty_page() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "hi", OLD);

    let page = ctx.service.aggregate_page(&general(), 0, 300).await.unwrap();
    assert!(page.messages.is_empty());
    assert_eq!(page.total_shown, 0);
  }

  /// Rendered pages are served from cache until the TTL elapses.
  #[tokio::test]
  async fn test_render_is_cached_until_ttl() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);

    let first = ctx.service.render_page(&general()).await.unwrap();
    assert!(first.contains("alice"));

    // Written behind the service's back: invisible while the entry is fresh
    ctx.write_file("general", "b.txt", "Author: bob\nhi", OLD + 1);
    let cached = ctx.service.render_page(&general()).await.unwrap();
    assert!(!cached.contains("bob"));

    ctx.expire_pages();
    let fresh = ctx.service.render_page(&general()).await.unwrap();
    assert!(fresh.contains("bob"));
  }

  /// Only a cache miss schedules a background pull.
  #[tokio::test]
  async fn test_miss_schedules_pull() {
    let ctx = TestContext::new();

    ctx.service.render_page(&general()).await.unwrap();
    ctx.service.render_page(&general()).await.unwrap();
    ctx.service.shutdown().await;

    assert_eq!(ctx.mirror.pulls(), 1);
  }

  /// A failing mirror never breaks the read path.
  #[tokio::test]
  async fn test_background_pull_failure_is_silent() {
    for script in [MirrorScript::Fail, MirrorScript::NotConfigured] {
      let ctx = TestContext::with_mirror(script);
      ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);

      let html = ctx.service.render_page(&general()).await.unwrap();
      ctx.service.shutdown().await;
      assert!(html.contains("alice"));
    }
  }

  /// Submitting invalidates the channel page and the pseudo-channel page.
  #[tokio::test]
  async fn test_submit_invalidates_pages() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);
    ctx.write_file("random", "b.txt", "Author: rita\nhi", OLD);

    let random = Channel::named("random").unwrap();
    ctx.service.render_page(&general()).await.unwrap();
    ctx.service.render_page(&Channel::All).await.unwrap();
    let random_before = ctx.service.render_page(&random).await.unwrap();

    ctx
      .service
      .submit_message("general", "zed", "late arrival", &[])
      .await
      .unwrap();

    assert!(ctx.service.render_page(&general()).await.unwrap().contains("zed"));
    assert!(ctx.service.render_page(&Channel::All).await.unwrap().contains("zed"));
    // Other channels keep their cached page
    assert_eq!(ctx.service.render_page(&random).await.unwrap(), random_before);
  }

  /// A write that lands while a miss is rendering keeps the older page out of the cache.
  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_submit_during_render_is_not_masked() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);

    ctx.renderer.arm();
    let reader = {
      let service = ctx.service.clone();
      tokio::spawn(async move { service.render_page(&general()).await })
    };
    ctx.renderer.wait_entered().await;

    ctx
      .service
      .submit_message("general", "zed", "late arrival", &[])
      .await
      .unwrap();

    ctx.renderer.release().await;
    let in_flight = reader.await.unwrap().unwrap();
    assert!(!in_flight.contains("late arrival"));

    let after = ctx.service.render_page(&general()).await.unwrap();
    assert!(after.contains("late arrival"));
    ctx.service.shutdown().await;
  }

  /// A changed pull that finishes while a miss is rendering keeps the older page out of the cache.
  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_changed_pull_during_render_is_not_masked() {
    let ctx = TestContext::with_mirror(MirrorScript::Changed);
    ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);

    ctx.renderer.arm();
    let reader = {
      let service = ctx.service.clone();
      tokio::spawn(async move { service.render_page(&general()).await })
    };
    ctx.renderer.wait_entered().await;

    // What the pull brought in, after the page was aggregated
    ctx.write_file("general", "upstream.txt", "Author: remote\nfrom upstream", OLD + 100);
    ctx.service.shutdown().await;
    assert_eq!(ctx.mirror.pulls(), 1);

    ctx.renderer.release().await;
    let in_flight = reader.await.unwrap().unwrap();
    assert!(!in_flight.contains("from upstream"));

    ctx.mirror.set(MirrorScript::Unchanged);
    let after = ctx.service.render_page(&general()).await.unwrap();
    assert!(after.contains("from upstream"));
    ctx.service.shutdown().await;
    assert_eq!(ctx.mirror.pulls(), 2);
  }

  /// A changed pull for one channel also drops the pseudo-channel page.
  #[tokio::test]
  async fn test_changed_pull_invalidates_everything_page() {
    let ctx = TestContext::new();
    ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);

    ctx.service.render_page(&Channel::All).await.unwrap();
    ctx.write_file("general", "b.txt", "Author: bob\npulled", OLD + 1);
    ctx.mirror.set(MirrorScript::Changed);
    ctx.service.sync_channel(&general()).await.unwrap();

    assert!(ctx.service.render_page(&Channel::All).await.unwrap().contains("pulled"));
    ctx.service.shutdown().await;
  }

  /// Rejected submissions leave no trace on disk.
  #[tokio::test]
  async fn test_rejected_submission_has_no_side_effects() {
    let ctx = TestContext::new();

    for channel in ["../etc", "gen eral", "", "everything"] {
      let err = ctx.service.submit_message(channel, "a", "hi", &[]).await.unwrap_err();
      assert_eq!(err.code(), -32602, "{channel:?} should be a validation error");
    }
    let err = ctx.service.submit_message("general", "a", "   ", &[]).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert!(!ctx.root().exists());
  }

  #[tokio::test]
  async fn test_submit_with_reply() {
    let ctx = TestContext::new();
    let parent = ctx
      .service
      .submit_message("general", "alice", "question?", &[])
      .await
      .unwrap();

    ctx
      .service
      .submit(SubmitRequest {
        channel: "general".to_string(),
        author: "bob".to_string(),
        body: "answer".to_string(),
        tags: Vec::new(),
        reply_to: Some(parent.message_id.clone()),
      })
      .await
      .unwrap();

    let page = ctx.service.aggregate_page(&general(), 50, 300).await.unwrap();
    let reply = page.messages.iter().find(|m| m.author == "bob").unwrap();
    assert_eq!(reply.reply_to.as_deref(), Some(parent.message_id.as_str()));
  }

  /// Concurrent writes never collide.
  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_submits() {
    let ctx = TestContext::new();
    let bodies: Vec<String> = (0..20).map(|i| format!("message {i}")).collect();

    let receipts = futures::future::join_all(
      bodies
        .iter()
        .map(|body| ctx.service.submit_message("general", "load", body, &[])),
    )
    .await;

    let mut ids: Vec<String> = receipts.into_iter().map(|r| r.unwrap().message_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(fs::read_dir(ctx.root().join("general")).unwrap().count(), 20);
  }

  #[tokio::test]
  async fn test_list_channels_seeds_default() {
    let ctx = TestContext::new();

    let channels = ctx.service.list_channels().await.unwrap();
    assert_eq!(channels, vec![Channel::All, general()]);
    assert!(ctx.root().join("general").is_dir());
  }

  /// Manual sync reports the outcome and invalidates on change.
  #[tokio::test]
  async fn test_manual_sync() {
    let ctx = TestContext::with_mirror(MirrorScript::Unchanged);
    ctx.write_file("general", "a.txt", "Author: alice\nhi", OLD);
    ctx.service.render_page(&general()).await.unwrap();
    ctx.service.shutdown().await;

    // Simulates files arriving from the mirror
    ctx.write_file("general", "b.txt", "Author: pulled\nhi", OLD + 1);

    let report = ctx.service.sync_channel(&general()).await.unwrap();
    assert_eq!(report.outcome, PullOutcome::Unchanged);
    assert!(!ctx.service.render_page(&general()).await.unwrap().contains("pulled"));

    ctx.mirror.set(MirrorScript::Changed);
    let report = ctx.service.sync_channel(&general()).await.unwrap();
    assert_eq!(report.outcome, PullOutcome::Changed);
    assert_eq!(report.channel, "general");
    assert!(ctx.service.render_page(&general()).await.unwrap().contains("pulled"));
  }

  #[tokio::test]
  async fn test_manual_sync_errors() {
    let ctx = TestContext::with_mirror(MirrorScript::Fail);

    let err = ctx
      .service
      .sync_channel(&Channel::named("ghost").unwrap())
      .await
      .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(err.code(), -32001);

    ctx.write_file("general", "a.txt", "hi", OLD);
    let err = ctx.service.sync_channel(&general()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Mirror(_)));
  }

  /// Mirror status is cached and dropped when the channel is written to.
  #[tokio::test]
  async fn test_mirror_status_cache() {
    let ctx = TestContext::new();

    let first = ctx.service.mirror_status(&general()).await.unwrap();
    let second = ctx.service.mirror_status(&general()).await.unwrap();
    assert_eq!(first, second);
    assert!(first.configured);
    assert_eq!(ctx.mirror.heads(), 1);

    ctx.service.submit_message("general", "a", "hi", &[]).await.unwrap();
    let third = ctx.service.mirror_status(&general()).await.unwrap();
    assert_eq!(ctx.mirror.heads(), 2);
    assert_ne!(first.head, third.head);
  }
}
