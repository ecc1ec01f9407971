mod common;

use common::*;
use mdview_core::{
    AccessMode, DurableStore, ExportError, ExportKind, Notice, OpenOutcome, OutlineEntry,
    PickedFile, RefreshOutcome, RestoreOutcome, SessionPhase, StaleChoice,
};

fn intro_outline() -> Vec<OutlineEntry> {
    vec![
        OutlineEntry::new(1, "Intro", "intro"),
        OutlineEntry::new(1, "Intro", "intro-1"),
    ]
}

// === open ===

#[tokio::test]
async fn test_open_persists_then_points_locator_at_identity() {
    let tab = session(MockPlatform::new("view=dark"));
    let file = MockFile::new("notes.md", "# Intro\nHello");

    let OpenOutcome::Opened(id) = tab.open(PickedFile::upload(file), None).await else {
        panic!("expected the file to open");
    };

    assert!(id.as_str().starts_with("notes.md_"));
    assert_eq!(tab.phase(), SessionPhase::Ready);
    assert_eq!(tab.identity(), Some(id.clone()));
    assert!(tab.platform().fast.raw(&id).is_some());
    assert_eq!(fragment(&tab), format!("file={}&view=dark", id));
    assert_eq!(tab.platform().durable.lookups(), 0);
}

#[tokio::test]
async fn test_opening_same_name_twice_gives_two_identities() {
    let tab = session(MockPlatform::new(""));

    let first = tab
        .open(PickedFile::upload(MockFile::new("a.md", "one")), None)
        .await;
    let second = tab
        .open(PickedFile::upload(MockFile::new("a.md", "two")), None)
        .await;

    let (OpenOutcome::Opened(first), OpenOutcome::Opened(second)) = (first, second) else {
        panic!("both opens should succeed");
    };
    assert_ne!(first, second);
    assert_eq!(tab.identity(), Some(second));
}

#[tokio::test]
async fn test_open_with_explicit_identity_reuses_it() {
    let tab = session(MockPlatform::new(""));
    let id = mdview_core::DocumentId::from("a.md_42");

    let outcome = tab
        .open(PickedFile::upload(MockFile::new("a.md", "x")), Some(id.clone()))
        .await;

    assert_eq!(outcome, OpenOutcome::Opened(id));
}

#[tokio::test]
async fn test_non_markdown_pick_is_ignored() {
    let tab = session(MockPlatform::new(""));

    let outcome = tab
        .open(PickedFile::upload(MockFile::new("photo.png", "...")), None)
        .await;

    assert_eq!(outcome, OpenOutcome::Rejected);
    assert_eq!(tab.phase(), SessionPhase::Empty);
    assert!(tab.document().is_none());
    assert_eq!(tab.platform().address.writes(), 0);
}

#[tokio::test]
async fn test_unreadable_file_keeps_its_name() {
    let tab = session(MockPlatform::new(""));

    let outcome = tab
        .open(PickedFile::upload(MockFile::unreadable("locked.md")), None)
        .await;

    assert!(matches!(outcome, OpenOutcome::ReadFailed(_)));
    assert_eq!(tab.phase(), SessionPhase::Empty);
    let toolbar = tab.toolbar();
    assert_eq!(toolbar.file_name.as_deref(), Some("locked.md"));
    assert!(toolbar.can_refresh);
    assert!(!toolbar.can_export_pdf);
    assert!(tab.platform().fast.is_empty());
    assert_eq!(fragment(&tab), "");
}

#[tokio::test]
async fn test_quota_failure_still_shows_content() {
    let platform = MockPlatform::with_stores(
        std::rc::Rc::new(mdview_core::MemoryFastStore::default().with_quota(16)),
        std::rc::Rc::new(mdview_core::MemoryDurableStore::new()),
        "",
    );
    let tab = session(platform);

    let outcome = tab
        .open(
            PickedFile::upload(MockFile::new("big.md", "# Big\nlots of text")),
            None,
        )
        .await;

    assert!(matches!(outcome, OpenOutcome::Opened(_)));
    assert_eq!(tab.phase(), SessionPhase::Ready);
    assert_eq!(
        tab.document().map(|d| d.content),
        Some("# Big\nlots of text".to_owned())
    );
    assert!(tab.toolbar().can_export_pdf);
    assert!(tab.platform().fast.is_empty());
    // Nothing was cached, so the address must not point at a session.
    assert_eq!(fragment(&tab), "");
}

// === supersession ===

#[tokio::test]
async fn test_later_open_wins_when_it_finishes_first() {
    let tab = session(MockPlatform::new(""));
    let (x, gate_x) = MockFile::gated("x.md", "# X");
    let (y, gate_y) = MockFile::gated("y.md", "# Y");

    let gates = [&*gate_y, &*gate_x];
    let (rx, ry, ()) = tokio::join!(
        tab.open(PickedFile::upload(x), None),
        tab.open(PickedFile::upload(y), None),
        release_in_order(&gates),
    );

    assert_eq!(rx, OpenOutcome::Superseded);
    assert!(matches!(ry, OpenOutcome::Opened(_)));
    assert_eq!(tab.document().map(|d| d.content), Some("# Y".to_owned()));
}

#[tokio::test]
async fn test_later_open_wins_when_it_finishes_last() {
    let tab = session(MockPlatform::new(""));
    let (x, gate_x) = MockFile::gated("x.md", "# X");
    let (y, gate_y) = MockFile::gated("y.md", "# Y");

    let gates = [&*gate_x, &*gate_y];
    let (rx, ry, ()) = tokio::join!(
        tab.open(PickedFile::upload(x), None),
        tab.open(PickedFile::upload(y), None),
        release_in_order(&gates),
    );

    assert_eq!(rx, OpenOutcome::Superseded);
    let OpenOutcome::Opened(y_id) = ry else {
        panic!("y should open");
    };
    assert_eq!(tab.document().map(|d| d.content), Some("# Y".to_owned()));
    assert_eq!(fragment(&tab), format!("file={}", y_id));
}

#[tokio::test]
async fn test_open_supersedes_inflight_refresh() {
    let tab = session(MockPlatform::new(""));
    let a = MockFile::new("a.md", "# A");
    tab.open(PickedFile::upload(a.clone()), None).await;
    a.set_text("# A2");
    let gate_a = a.hold();

    let gates = [&*gate_a];
    let (refreshed, opened, ()) = tokio::join!(
        tab.refresh(),
        tab.open(PickedFile::upload(MockFile::new("b.md", "# B")), None),
        release_in_order(&gates),
    );

    assert_eq!(refreshed, RefreshOutcome::Superseded);
    assert!(matches!(opened, OpenOutcome::Opened(_)));
    assert_eq!(tab.document().map(|d| d.content), Some("# B".to_owned()));
}

// === refresh ===

#[tokio::test]
async fn test_refresh_rereads_under_same_identity() {
    let tab = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "v1");
    let OpenOutcome::Opened(id) = tab.open(PickedFile::upload(file.clone()), None).await else {
        panic!("open failed");
    };
    let before = fragment(&tab);

    file.set_text("v2");
    let outcome = tab.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed(id.clone()));
    assert_eq!(tab.identity(), Some(id.clone()));
    assert_eq!(tab.document().map(|d| d.content), Some("v2".to_owned()));
    assert_eq!(cached_content(&tab, &id), Some("v2".to_owned()));
    assert_eq!(fragment(&tab), before);
}

#[tokio::test]
async fn test_revoked_reference_falls_back_to_held_file() {
    let tab = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "v1");
    let reference = MockReference::new(&file);
    let OpenOutcome::Opened(id) = tab
        .open(PickedFile::with_reference(file.clone(), reference.clone()), None)
        .await
    else {
        panic!("open failed");
    };
    assert!(tab.platform().durable.contains(&id));

    reference.revoke();
    file.set_text("v2");
    let outcome = tab.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed(id.clone()));
    assert_eq!(tab.document().map(|d| d.content), Some("v2".to_owned()));
    assert!(!tab.has_reference());
    assert!(!tab.platform().durable.contains(&id));
    assert_eq!(
        tab.document().map(|d| d.access_mode),
        Some(AccessMode::LegacyUpload)
    );
    assert_eq!(tab.platform().picker.calls(), 0);
}

#[tokio::test]
async fn test_failed_held_file_reports_without_touching_content() {
    let tab = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "v1");
    tab.open(PickedFile::upload(file.clone()), None).await;

    file.break_reads();
    let outcome = tab.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Failed);
    assert_eq!(tab.phase(), SessionPhase::Ready);
    assert_eq!(tab.document().map(|d| d.content), Some("v1".to_owned()));
    assert_eq!(
        tab.platform().notices(),
        vec![Notice::RefreshFailed {
            file_name: "notes.md".into()
        }]
    );
}

#[tokio::test]
async fn test_refresh_over_quota_drops_superseded_cache() {
    let platform = MockPlatform::with_stores(
        std::rc::Rc::new(mdview_core::MemoryFastStore::default().with_quota(120)),
        std::rc::Rc::new(mdview_core::MemoryDurableStore::new()),
        "",
    );
    let tab = session(platform);
    let file = MockFile::new("a.md", "# Old");
    let OpenOutcome::Opened(id) = tab.open(PickedFile::upload(file.clone()), None).await else {
        panic!("open failed");
    };
    let url = fragment(&tab);
    assert_eq!(cached_content(&tab, &id), Some("# Old".to_owned()));

    file.set_text(&"x".repeat(500));
    assert_eq!(tab.refresh().await, RefreshOutcome::Refreshed(id.clone()));

    assert_eq!(tab.document().map(|d| d.content.len()), Some(500));
    assert_eq!(cached_content(&tab, &id), None);
    assert_eq!(fragment(&tab), "");

    // A reload on the old address must not bring back the old text.
    let reloaded = session(tab.platform().another_tab(&url));
    assert_eq!(reloaded.restore().await, RestoreOutcome::Nothing);
    assert!(reloaded.document().is_none());
}

#[tokio::test]
async fn test_refresh_with_nothing_open() {
    let tab = session(MockPlatform::new(""));

    assert_eq!(tab.refresh().await, RefreshOutcome::NothingToRefresh);
    assert_eq!(tab.platform().notices(), vec![Notice::NothingToRefresh]);
    assert_eq!(tab.platform().picker.calls(), 0);
}

/// Helper: open `notes.md` with a reference in one tab, then restore it in
/// a second tab whose durable store has lost the reference.
async fn restored_without_reference() -> (TestSession, mdview_core::DocumentId) {
    let first = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "cached");
    let OpenOutcome::Opened(id) = first
        .open(PickedFile::with_reference(file.clone(), MockReference::new(&file)), None)
        .await
    else {
        panic!("open failed");
    };

    let platform = MockPlatform::with_stores(
        first.platform().fast.clone(),
        std::rc::Rc::new(mdview_core::MemoryDurableStore::new()),
        &format!("file={}", id),
    );
    let second = session(platform);
    assert_eq!(second.restore().await, RestoreOutcome::Cached(id.clone()));
    (second, id)
}

#[tokio::test]
async fn test_refresh_without_sources_asks_picker_for_same_file() {
    let (tab, id) = restored_without_reference().await;
    let picked = MockFile::new("notes.md", "fresh");
    tab.platform()
        .picker
        .queue(PickedFile::with_reference(picked.clone(), MockReference::new(&picked)));

    let outcome = tab.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed(id.clone()));
    assert_eq!(tab.identity(), Some(id.clone()));
    assert_eq!(tab.document().map(|d| d.content), Some("fresh".to_owned()));
    assert!(tab.has_reference());
    assert!(tab.platform().durable.contains(&id));
    assert_eq!(fragment(&tab), format!("file={}", id));
}

#[tokio::test]
async fn test_picker_returning_another_file_opens_new_identity() {
    let (tab, id) = restored_without_reference().await;
    tab.platform()
        .picker
        .queue(PickedFile::upload(MockFile::new("other.md", "# Other")));

    let RefreshOutcome::Reopened(new_id) = tab.refresh().await else {
        panic!("expected a new document");
    };

    assert_ne!(new_id, id);
    assert!(new_id.as_str().starts_with("other.md_"));
    assert_eq!(fragment(&tab), format!("file={}", new_id));
}

#[tokio::test]
async fn test_dismissed_picker_changes_nothing() {
    let (tab, id) = restored_without_reference().await;
    let version = tab.content_version();

    let outcome = tab.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Cancelled);
    assert_eq!(tab.platform().picker.calls(), 1);
    assert_eq!(tab.phase(), SessionPhase::Ready);
    assert_eq!(tab.identity(), Some(id));
    assert_eq!(tab.content_version(), version);
    assert_eq!(tab.document().map(|d| d.content), Some("cached".to_owned()));
}

// === restore ===

#[tokio::test]
async fn test_legacy_upload_restores_from_cache_in_new_tab() {
    let tab_a = session(MockPlatform::new(""));
    let OpenOutcome::Opened(id) = tab_a
        .open(
            PickedFile::upload(MockFile::new("notes.md", "# Intro\nHello")),
            None,
        )
        .await
    else {
        panic!("open failed");
    };
    assert_eq!(
        tab_a.platform().fast.raw(&id).as_deref(),
        Some(r##"{"fileName":"notes.md","content":"# Intro\nHello","accessMode":false}"##)
    );
    assert_eq!(fragment(&tab_a), format!("file={}", id));

    let tab_b = session(tab_a.platform().another_tab(&format!("#file={}", id)));
    let outcome = tab_b.restore().await;

    assert_eq!(outcome, RestoreOutcome::Cached(id));
    assert_eq!(tab_b.phase(), SessionPhase::Ready);
    insta::assert_debug_snapshot!(tab_b.document(), @r##"
    Some(
        DocumentRecord {
            file_name: "notes.md",
            content: "# Intro\nHello",
            access_mode: LegacyUpload,
        },
    )
    "##);
    assert_eq!(tab_b.platform().picker.calls(), 0);
    assert_eq!(tab_b.platform().durable.lookups(), 0);
    assert!(tab_b.platform().notices().is_empty());
}

#[tokio::test]
async fn test_direct_access_restore_rereads_live_file() {
    let tab_a = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "old");
    let OpenOutcome::Opened(id) = tab_a
        .open(PickedFile::with_reference(file.clone(), MockReference::new(&file)), None)
        .await
    else {
        panic!("open failed");
    };

    file.set_text("new");
    let tab_b = session(tab_a.platform().another_tab(&format!("file={}", id)));
    let outcome = tab_b.restore().await;

    assert_eq!(outcome, RestoreOutcome::Live(id.clone()));
    assert_eq!(tab_b.phase(), SessionPhase::Ready);
    assert_eq!(tab_b.document().map(|d| d.content), Some("new".to_owned()));
    assert_eq!(cached_content(&tab_b, &id), Some("new".to_owned()));
    assert!(tab_b.has_reference());
    assert!(tab_b.platform().notices().is_empty());
    // Cached text went up first, then the live text replaced it.
    assert_eq!(tab_b.platform().content_changes(), vec![1, 2]);
}

#[tokio::test]
async fn test_renamed_reference_is_discarded_and_prompt_shown_once() {
    let tab_a = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "cached");
    let OpenOutcome::Opened(id) = tab_a
        .open(PickedFile::with_reference(file.clone(), MockReference::new(&file)), None)
        .await
    else {
        panic!("open failed");
    };
    let elsewhere = MockFile::new("other.md", "not it");
    tab_a
        .platform()
        .durable
        .put(&id, &MockReference::new(&elsewhere))
        .await
        .unwrap();

    let tab_b = session(tab_a.platform().another_tab(&format!("file={}", id)));
    assert_eq!(tab_b.restore().await, RestoreOutcome::Cached(id.clone()));
    assert_eq!(tab_b.document().map(|d| d.content), Some("cached".to_owned()));
    assert!(!tab_b.platform().durable.contains(&id));
    assert_eq!(
        tab_b.platform().notices(),
        vec![Notice::StalePrompt {
            id: id.clone(),
            file_name: "notes.md".into()
        }]
    );

    // Same tab session, reloaded: the marker suppresses a second prompt.
    let reloaded = session(tab_b.platform().another_tab(&format!("file={}", id)));
    assert_eq!(reloaded.restore().await, RestoreOutcome::Cached(id));
    assert!(reloaded.platform().notices().is_empty());
}

#[tokio::test]
async fn test_reload_latest_from_stale_prompt_goes_through_picker() {
    let (tab, id) = restored_without_reference().await;
    assert!(matches!(
        tab.platform().notices().as_slice(),
        [Notice::StalePrompt { .. }]
    ));
    tab.platform()
        .picker
        .queue(PickedFile::upload(MockFile::new("notes.md", "latest")));

    let outcome = tab.resolve_stale_prompt(StaleChoice::ReloadLatest).await;

    assert_eq!(outcome, Some(RefreshOutcome::Refreshed(id)));
    assert_eq!(tab.document().map(|d| d.content), Some("latest".to_owned()));
}

#[tokio::test]
async fn test_keep_cached_leaves_everything_alone() {
    let (tab, _) = restored_without_reference().await;
    let version = tab.content_version();

    assert_eq!(tab.resolve_stale_prompt(StaleChoice::KeepCached).await, None);
    assert_eq!(tab.content_version(), version);
    assert_eq!(tab.platform().picker.calls(), 0);
}

#[tokio::test]
async fn test_restore_without_locator_or_cache_stays_empty() {
    let tab = session(MockPlatform::new("view=dark"));
    assert_eq!(tab.restore().await, RestoreOutcome::Nothing);

    let tab = session(MockPlatform::new("file=gone.md_1"));
    assert_eq!(tab.restore().await, RestoreOutcome::Nothing);
    assert_eq!(tab.phase(), SessionPhase::Empty);
    assert_eq!(tab.platform().durable.lookups(), 0);
}

// === durable store failures ===

#[tokio::test]
async fn test_open_survives_unavailable_durable_store() {
    let tab = session(MockPlatform::new(""));
    tab.platform().durable.set_unavailable(true);
    let file = MockFile::new("notes.md", "# Intro");

    let OpenOutcome::Opened(id) = tab
        .open(PickedFile::with_reference(file.clone(), MockReference::new(&file)), None)
        .await
    else {
        panic!("open failed");
    };

    assert_eq!(tab.phase(), SessionPhase::Ready);
    assert!(tab.has_reference());
    assert_eq!(cached_content(&tab, &id), Some("# Intro".to_owned()));
    assert_eq!(fragment(&tab), format!("file={}", id));
    assert!(tab.platform().notices().is_empty());

    tab.platform().durable.set_unavailable(false);
    assert!(!tab.platform().durable.contains(&id));
}

#[tokio::test]
async fn test_direct_access_restore_falls_back_to_cache_when_durable_store_fails() {
    let tab_a = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "cached");
    let OpenOutcome::Opened(id) = tab_a
        .open(PickedFile::with_reference(file.clone(), MockReference::new(&file)), None)
        .await
    else {
        panic!("open failed");
    };
    file.set_text("newer");

    let tab_b = session(tab_a.platform().another_tab(&format!("file={}", id)));
    tab_b.platform().durable.set_unavailable(true);
    let outcome = tab_b.restore().await;

    assert_eq!(outcome, RestoreOutcome::Cached(id.clone()));
    assert_eq!(tab_b.phase(), SessionPhase::Ready);
    assert_eq!(tab_b.document().map(|d| d.content), Some("cached".to_owned()));
    assert!(!tab_b.has_reference());
    assert_eq!(tab_b.platform().durable.lookups(), 1);
    assert_eq!(
        tab_b.platform().notices(),
        vec![Notice::StalePrompt {
            id,
            file_name: "notes.md".into()
        }]
    );
}

#[tokio::test]
async fn test_refresh_survives_failed_reference_delete() {
    let tab = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "v1");
    let reference = MockReference::new(&file);
    let OpenOutcome::Opened(id) = tab
        .open(PickedFile::with_reference(file.clone(), reference.clone()), None)
        .await
    else {
        panic!("open failed");
    };

    reference.revoke();
    tab.platform().durable.set_unavailable(true);
    file.set_text("v2");
    let outcome = tab.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed(id.clone()));
    assert_eq!(tab.document().map(|d| d.content), Some("v2".to_owned()));
    assert!(!tab.has_reference());
    assert_eq!(cached_content(&tab, &id), Some("v2".to_owned()));
    assert!(tab.platform().notices().is_empty());
}

// === headings and scrolling ===

#[tokio::test]
async fn test_heading_navigation_survives_reload() {
    let tab_a = session(MockPlatform::new(""));
    let OpenOutcome::Opened(id) = tab_a
        .open(
            PickedFile::upload(MockFile::new("notes.md", "# Intro\n\n# Intro")),
            None,
        )
        .await
    else {
        panic!("open failed");
    };
    tab_a.platform().viewport.set_top("intro", 0.0);
    tab_a.platform().viewport.set_top("intro-1", 600.0);
    assert!(tab_a.content_rendered(tab_a.content_version(), intro_outline()));

    assert!(tab_a.navigate_to("intro-1"));
    let url = fragment(&tab_a);
    assert_eq!(url, format!("file={}&heading=intro-1", id));

    let tab_b = session(tab_a.platform().another_tab(&url));
    tab_b.restore().await;
    tab_b.platform().viewport.set_top("intro", -600.0);
    tab_b.platform().viewport.set_top("intro-1", 0.0);
    assert!(tab_b.platform().viewport.scrolled().is_empty());

    assert!(tab_b.content_rendered(tab_b.content_version(), intro_outline()));
    assert_eq!(tab_b.platform().viewport.scrolled(), vec!["intro-1"]);
}

/// Helper: a direct-access `notes.md` opened in one tab, and a second tab on
/// `fragment` sharing its stores. Reads of the file are held.
async fn direct_access_reload(
    text: &str,
    fragment_for: impl Fn(&mdview_core::DocumentId) -> String,
) -> (TestSession, mdview_core::DocumentId, MockFile, std::rc::Rc<tokio::sync::Notify>) {
    let tab_a = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", text);
    let OpenOutcome::Opened(id) = tab_a
        .open(PickedFile::with_reference(file.clone(), MockReference::new(&file)), None)
        .await
    else {
        panic!("open failed");
    };
    let gate = file.hold();
    let tab_b = session(tab_a.platform().another_tab(&fragment_for(&id)));
    (tab_b, id, file, gate)
}

#[tokio::test]
async fn test_scroll_tracking_resumes_after_unchanged_live_reread() {
    let (tab, id, _file, gate) =
        direct_access_reload("# Intro\n\n## Usage", |id| format!("file={}&heading=intro", id))
            .await;
    let outline = vec![
        OutlineEntry::new(1, "Intro", "intro"),
        OutlineEntry::new(2, "Usage", "usage"),
    ];
    tab.platform().viewport.set_top("intro", 0.0);
    tab.platform().viewport.set_top("usage", 400.0);

    let (outcome, ()) = tokio::join!(tab.restore(), async {
        tokio::task::yield_now().await;
        assert_eq!(tab.phase(), SessionPhase::StaleReady);
        assert!(tab.content_rendered(tab.content_version(), outline.clone()));
        gate.notify_one();
    });

    assert_eq!(outcome, RestoreOutcome::Live(id.clone()));
    assert_eq!(tab.phase(), SessionPhase::Ready);
    assert_eq!(tab.platform().content_changes(), vec![1]);
    assert_eq!(tab.platform().viewport.scrolled(), vec!["intro"]);

    tab.platform().viewport.set_top("intro", -300.0);
    tab.platform().viewport.set_top("usage", 10.0);
    assert!(tab.track_scroll());
    assert_eq!(fragment(&tab), format!("file={}&heading=usage", id));
}

#[tokio::test]
async fn test_scroll_tracking_resumes_after_failed_live_reread() {
    let (tab, id, file, gate) =
        direct_access_reload("# Intro\n\n## Usage", |id| format!("file={}&heading=intro", id))
            .await;
    let outline = vec![
        OutlineEntry::new(1, "Intro", "intro"),
        OutlineEntry::new(2, "Usage", "usage"),
    ];
    tab.platform().viewport.set_top("intro", 0.0);
    tab.platform().viewport.set_top("usage", 400.0);
    file.break_reads();

    let (outcome, ()) = tokio::join!(tab.restore(), async {
        tokio::task::yield_now().await;
        assert!(tab.content_rendered(tab.content_version(), outline.clone()));
        gate.notify_one();
    });

    assert_eq!(outcome, RestoreOutcome::Cached(id.clone()));
    assert_eq!(tab.phase(), SessionPhase::Ready);

    tab.platform().viewport.set_top("intro", -300.0);
    tab.platform().viewport.set_top("usage", 10.0);
    assert!(tab.track_scroll());
    assert_eq!(fragment(&tab), format!("file={}&heading=usage", id));
}

#[tokio::test]
async fn test_heading_added_by_live_reread_is_still_scrolled_to() {
    let (tab, id, file, gate) =
        direct_access_reload("# Intro", |id| format!("file={}&heading=usage", id)).await;
    file.set_text("# Intro\n\n## Usage");
    tab.platform().viewport.set_top("intro", 0.0);
    tab.platform().viewport.set_top("usage", 400.0);

    let (outcome, ()) = tokio::join!(tab.restore(), async {
        tokio::task::yield_now().await;
        let cached = vec![OutlineEntry::new(1, "Intro", "intro")];
        assert!(tab.content_rendered(tab.content_version(), cached));
        gate.notify_one();
    });

    assert_eq!(outcome, RestoreOutcome::Live(id));
    assert!(tab.platform().viewport.scrolled().is_empty());

    let live = vec![
        OutlineEntry::new(1, "Intro", "intro"),
        OutlineEntry::new(2, "Usage", "usage"),
    ];
    assert!(tab.content_rendered(tab.content_version(), live));
    assert_eq!(tab.platform().viewport.scrolled(), vec!["usage"]);
}

#[tokio::test]
async fn test_navigate_to_unknown_anchor_leaves_locator() {
    let tab = session(MockPlatform::new(""));
    tab.open(PickedFile::upload(MockFile::new("a.md", "# A")), None)
        .await;
    let before = fragment(&tab);

    assert!(!tab.navigate_to("missing"));
    assert_eq!(fragment(&tab), before);
}

#[tokio::test]
async fn test_scroll_tracking_writes_only_on_change() {
    let tab = session(MockPlatform::new("view=dark"));
    let OpenOutcome::Opened(id) = tab
        .open(PickedFile::upload(MockFile::new("a.md", "# Doc")), None)
        .await
    else {
        panic!("open failed");
    };
    let outline = vec![
        OutlineEntry::new(1, "Intro", "intro"),
        OutlineEntry::new(2, "Setup", "setup"),
        OutlineEntry::new(2, "Usage", "usage"),
    ];
    tab.content_rendered(tab.content_version(), outline);
    let viewport = &tab.platform().viewport;
    viewport.set_top("intro", -200.0);
    viewport.set_top("setup", 40.0);
    viewport.set_top("usage", 500.0);

    assert!(tab.track_scroll());
    assert_eq!(fragment(&tab), format!("file={}&heading=setup&view=dark", id));
    let writes = tab.platform().address.writes();

    viewport.set_top("setup", 35.0);
    assert!(!tab.track_scroll());
    assert!(!tab.track_scroll());
    assert_eq!(tab.platform().address.writes(), writes);

    viewport.set_top("usage", 60.0);
    assert!(tab.track_scroll());
    assert_eq!(fragment(&tab), format!("file={}&heading=usage&view=dark", id));

    for (heading, top) in [("intro", 300.0), ("setup", 500.0), ("usage", 900.0)] {
        viewport.set_top(heading, top);
    }
    assert!(tab.track_scroll());
    assert_eq!(fragment(&tab), format!("file={}&view=dark", id));
    assert_eq!(tab.document().map(|d| d.content), Some("# Doc".to_owned()));
}

#[tokio::test]
async fn test_scroll_tracking_idle_without_outline() {
    let tab = session(MockPlatform::new(""));
    tab.open(PickedFile::upload(MockFile::new("a.md", "plain")), None)
        .await;
    let writes = tab.platform().address.writes();

    assert!(!tab.track_scroll());
    assert_eq!(tab.platform().address.writes(), writes);
}

// === rendering signals and export ===

#[tokio::test]
async fn test_png_export_waits_for_diagrams_of_current_content() {
    let tab = session(MockPlatform::new(""));
    let file = MockFile::new("notes.md", "v1");
    tab.open(PickedFile::upload(file.clone()), None).await;
    assert!(!tab.diagrams_ready());
    assert_eq!(
        tab.request_export(ExportKind::Png),
        Err(ExportError::DiagramsPending)
    );
    assert!(tab.request_export(ExportKind::Pdf).is_ok());

    let old = tab.content_version();
    file.set_text("v2");
    tab.refresh().await;
    assert!(!tab.diagrams_ready());

    assert!(!tab.mark_diagrams_ready(old));
    assert!(!tab.content_rendered(old, Vec::new()));
    assert!(!tab.diagrams_ready());

    assert!(tab.mark_diagrams_ready(tab.content_version()));
    let request = tab.request_export(ExportKind::Png).unwrap();
    let name = request.file_name.unwrap();
    assert!(name.starts_with("notes_"));
    assert!(name.ends_with(".png"));
    assert_eq!(name.len(), "notes_".len() + 19 + ".png".len());
}

#[tokio::test]
async fn test_export_refused_without_content() {
    let tab = session(MockPlatform::new(""));
    assert_eq!(
        tab.request_export(ExportKind::Pdf),
        Err(ExportError::NoContent)
    );
}

#[tokio::test]
async fn test_export_failure_is_a_notice_only() {
    let tab = session(MockPlatform::new(""));
    tab.open(PickedFile::upload(MockFile::new("a.md", "# A")), None)
        .await;
    let version = tab.content_version();

    tab.report_export_failure("canvas is tainted");

    assert_eq!(
        tab.platform().notices(),
        vec![Notice::ExportFailed("canvas is tainted".into())]
    );
    assert_eq!(tab.content_version(), version);
    assert_eq!(tab.phase(), SessionPhase::Ready);
}
