// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::WardrobeFixture;

use anyhow::Result;
use clothesline::{
    index::INDEX_KEY, tags::DEFAULT_PRESET_TAGS, EmptyState, SaveDraft, SaveError, Tags,
    WardrobeItem,
};
use pretty_assertions::assert_eq;

fn ids(items: &[WardrobeItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[tokio::test]
async fn saved_photo_is_browsable_after_reopen() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let item = fixture.add("shirt.jpg", &["Top", " Blue"]).await?;

    let view = fixture.open()?.browse().await;
    assert_eq!(view.items, vec![item.clone()]);
    assert_eq!(view.empty_state(), EmptyState::NotEmpty);
    assert_eq!(std::fs::read(&item.uri)?, b"shirt.jpg");
    assert!(item.uri.starts_with(&*fixture.config().blob_root().to_string_lossy()));

    Ok(())
}

#[tokio::test]
async fn filter_narrows_browsed_items() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let untagged = fixture.add("plain.jpg", &[]).await?;
    let bottom = fixture.add("jeans.jpg", &["bottom"]).await?;
    let top = fixture.add("tee.jpg", &["top"]).await?;

    let wardrobe = fixture.open()?;
    wardrobe.filter().set_active(["TOP"]).await?;
    let view = wardrobe.browse().await;
    assert_eq!(ids(&view.items), vec![top.id.as_str()]);

    // Filter survives reopening.
    let wardrobe = fixture.open()?;
    assert_eq!(wardrobe.filter().get_active().await, ["top"].into_iter().collect::<Tags>());

    wardrobe.filter().clear().await?;
    let view = wardrobe.browse().await;
    assert_eq!(
        ids(&view.items),
        vec![top.id.as_str(), bottom.id.as_str(), untagged.id.as_str()]
    );

    Ok(())
}

#[tokio::test]
async fn unmatched_filter_reports_no_matches() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    fixture.add("tee.jpg", &["top"]).await?;

    let wardrobe = fixture.open()?;
    wardrobe.filter().set_active(["winter"]).await?;
    let view = wardrobe.browse().await;
    assert!(view.items.is_empty());
    assert_eq!(view.total, 1);
    assert_eq!(view.empty_state(), EmptyState::NoMatches);

    Ok(())
}

#[tokio::test]
async fn lost_index_recovers_from_blob_store() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    fixture.add("tee.jpg", &["top"]).await?;
    fixture.add("jeans.jpg", &["bottom"]).await?;
    fixture.poke(INDEX_KEY, "definitely not json").await?;

    let view = fixture.open()?.browse().await;
    assert_eq!(view.items.len(), 2);
    let listed = fixture.blobs().list().await;
    for item in &view.items {
        assert!(item.tags.is_empty());
        assert_eq!(item.id, item.uri);
        assert!(listed.contains(&item.id));
    }

    Ok(())
}

#[tokio::test]
async fn empty_wardrobe_reports_no_items() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let view = fixture.open()?.browse().await;
    assert_eq!(view.empty_state(), EmptyState::NoItems);

    // Browsing creates the sandbox.
    assert!(fixture.config().blob_root().is_dir());

    Ok(())
}

#[tokio::test]
async fn index_round_trips_through_disk() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let items = vec![
        WardrobeItem {
            id: "3".into(),
            uri: "https://example.org/coat.png".into(),
            created_at: 1_700_000_300_000,
            tags: ["outerwear", "winter"].into_iter().collect(),
        },
        WardrobeItem {
            id: "2".into(),
            uri: "ph://ABC/L0/001".into(),
            created_at: 1_700_000_200_000,
            tags: Tags::new(),
        },
        WardrobeItem {
            id: "1".into(),
            uri: "/somewhere/img_1.jpg".into(),
            created_at: 1_700_000_100_000,
            tags: ["top"].into_iter().collect(),
        },
    ];

    fixture.open()?.index().write_all(&items).await?;
    assert_eq!(fixture.open()?.index().read_all().await, items);

    Ok(())
}

#[tokio::test]
async fn delete_is_idempotent() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let keep = fixture.add("tee.jpg", &[]).await?;
    let gone = fixture.add("jeans.jpg", &[]).await?;

    let wardrobe = fixture.open()?;
    assert!(wardrobe.delete(&gone.id).await?);
    assert!(!wardrobe.delete(&gone.id).await?);
    assert!(!wardrobe.delete("never-existed").await?);

    assert_eq!(ids(&wardrobe.index().read_all().await), vec![keep.id.as_str()]);
    assert_eq!(fixture.blobs().list().await, vec![keep.uri.clone()]);

    Ok(())
}

#[tokio::test]
async fn failed_save_keeps_draft() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let wardrobe = fixture.open()?;

    let mut draft = SaveDraft::new();
    draft.tags = ["linen"].into_iter().collect();
    let before = draft.clone();

    let result = wardrobe.save(&draft).await;
    assert!(matches!(result, Err(SaveError::MissingImage)));
    assert_eq!(draft, before);

    Ok(())
}

#[tokio::test]
async fn known_tags_union_registry_and_items() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let wardrobe = fixture.open()?;
    let item = WardrobeItem::new("x", "ph://x", ["Zebra Print"].into_iter().collect());
    wardrobe.index().append(item).await?;
    wardrobe.tags().add("  Blue ").await?;
    wardrobe.tags().add("blue").await?;

    let known = wardrobe.all_known_tags().await;
    assert!(known.contains(&"zebra print".to_string()));
    assert_eq!(known.iter().filter(|tag| *tag == "blue").count(), 1);
    assert_eq!(known.len(), DEFAULT_PRESET_TAGS.len() + 1);

    let mut sorted = known.clone();
    sorted.sort();
    assert_eq!(known, sorted);

    Ok(())
}

#[tokio::test]
async fn shared_handle_serializes_concurrent_edits() -> Result<()> {
    let fixture = WardrobeFixture::new()?;
    let wardrobe = fixture.open()?;

    let saves = (0..8).map(|n| {
        let wardrobe = wardrobe.clone();
        let mut draft = SaveDraft::new();
        draft.image = Some(format!("ph://asset/{n}"));
        tokio::spawn(async move { wardrobe.save(&draft).await })
    });
    for save in futures::future::join_all(saves).await {
        save??;
    }

    let items = wardrobe.index().read_all().await;
    assert_eq!(items.len(), 8);

    Ok(())
}
