//! Per-DAT planning: from a parsed DAT to the list of files to fetch.

use tokio_util::sync::CancellationToken;

use crate::config::DuplicatePolicy;
use crate::dat::DatFile;
use crate::error::Result;
use crate::listing::RemoteDirEntry;
use crate::mirror::MirrorClient;
use crate::reconcile::{Reconciliation, reconcile};
use crate::resolve::{Selector, resolve_catalog, resolve_collection};

/// Whether to skip automatic matching and always ask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Always prompt for the catalog.
    pub manual_catalog: bool,
    /// Always prompt for the system collection.
    pub manual_collection: bool,
}

/// Everything the download phase needs for one DAT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// The parsed DAT.
    pub dat: DatFile,
    /// Chosen catalog directory.
    pub catalog: RemoteDirEntry,
    /// Chosen collection directory inside the catalog.
    pub collection: RemoteDirEntry,
    /// Wanted names split into found and missing.
    pub reconciliation: Reconciliation,
}

/// Resolves `dat` against the mirror and reconciles it with the collection.
///
/// Listings are fetched in order: the mirror root, the chosen catalog, then
/// the chosen collection. Each fetch is abandoned when `cancel` fires.
///
/// # Errors
///
/// Returns listing, HTTP or selection errors from the individual phases,
/// or [`Error::Cancelled`](crate::Error::Cancelled).
pub async fn plan<S: Selector + ?Sized>(
    mirror: &MirrorClient,
    dat: DatFile,
    options: ResolveOptions,
    policy: DuplicatePolicy,
    selector: &mut S,
    cancel: &CancellationToken,
) -> Result<Plan> {
    let catalogs = mirror.fetch_listing("", cancel).await?;
    let catalog = resolve_catalog(
        &catalogs,
        dat.catalog.as_deref(),
        options.manual_catalog,
        selector,
    )
    .await?
    .clone();
    log::info!("Catalog for {}: {}", dat.name, catalog.title);

    let collections = mirror.fetch_listing(&catalog.href, cancel).await?;
    let collection = resolve_collection(
        &collections,
        &dat.name,
        options.manual_collection,
        selector,
    )
    .await?
    .clone();
    log::info!("Collection for {}: {}", dat.name, collection.title);

    let index = mirror
        .enumerate(&catalog.href, &collection.href, policy, cancel)
        .await?;
    let reconciliation = reconcile(&dat.wanted, &index);

    Ok(Plan {
        dat,
        catalog,
        collection,
        reconciliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::config::MirrorConfig;
    use crate::error::Error;
    use crate::listing::listing_page;
    use crate::resolve::SelectionKind;

    const DAT: &str = r#"<?xml version="1.0"?>
<datafile>
  <header>
    <name>FixDat_Test System (Retool)</name>
    <url>https://redump.org/</url>
  </header>
  <game name="Foo"/>
  <game name="Bar"/>
</datafile>"#;

    /// Picks a fixed index and counts how often it was asked.
    struct Fixed {
        answer: usize,
        asked: Vec<SelectionKind>,
    }

    #[async_trait]
    impl Selector for Fixed {
        async fn select(&mut self, kind: SelectionKind, _candidates: &[String]) -> Result<usize> {
            self.asked.push(kind);
            Ok(self.answer)
        }
    }

    async fn mirror_with_listings(server: &mut mockito::ServerGuard) -> Vec<mockito::Mock> {
        let root = listing_page(&[("No-Intro", "No-Intro/"), ("Redump", "Redump/")]);
        let catalog = listing_page(&[
            ("Other System", "Other%20System/"),
            ("Test System", "Test%20System/"),
        ]);
        let collection = listing_page(&[("Foo.zip", "Foo.zip"), ("Baz.zip", "Baz.zip")]);
        vec![
            server
                .mock("GET", "/files/")
                .with_body(root)
                .create_async()
                .await,
            server
                .mock("GET", "/files/Redump/")
                .with_body(catalog)
                .create_async()
                .await,
            server
                .mock("GET", "/files/Redump/Test%20System/")
                .with_body(collection)
                .create_async()
                .await,
        ]
    }

    fn mirror_for(server: &mockito::ServerGuard) -> MirrorClient {
        MirrorClient::new(&MirrorConfig::default().with_base_url(format!("{}/files", server.url())))
            .unwrap()
    }

    #[tokio::test]
    async fn plan_resolves_without_prompting() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mirror_with_listings(&mut server).await;
        let mirror = mirror_for(&server);
        let dat = DatFile::parse(DAT).unwrap();
        let mut selector = Fixed {
            answer: 0,
            asked: Vec::new(),
        };

        let plan = plan(
            &mirror,
            dat,
            ResolveOptions::default(),
            DuplicatePolicy::default(),
            &mut selector,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(selector.asked.is_empty());
        assert_eq!(plan.catalog.title, "Redump");
        assert_eq!(plan.collection.title, "Test System");
        assert_eq!(plan.reconciliation.found.len(), 1);
        assert_eq!(
            plan.reconciliation.found[0].url,
            format!("{}/files/Redump/Test%20System/Foo.zip", server.url())
        );
        assert_eq!(plan.reconciliation.missing, vec!["Bar"]);
    }

    #[tokio::test]
    async fn manual_options_prompt_for_both_levels() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mirror_with_listings(&mut server).await;
        let mirror = mirror_for(&server);
        let mut selector = Fixed {
            answer: 1,
            asked: Vec::new(),
        };
        let options = ResolveOptions {
            manual_catalog: true,
            manual_collection: true,
        };

        let plan = plan(
            &mirror,
            DatFile::parse(DAT).unwrap(),
            options,
            DuplicatePolicy::default(),
            &mut selector,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            selector.asked,
            vec![SelectionKind::Catalog, SelectionKind::Collection]
        );
        assert_eq!(plan.catalog.title, "Redump");
        assert_eq!(plan.collection.title, "Test System");
    }

    #[tokio::test]
    async fn listing_failure_aborts_plan() {
        let mut server = mockito::Server::new_async().await;
        let _root = server
            .mock("GET", "/files/")
            .with_status(503)
            .create_async()
            .await;
        let mirror = mirror_for(&server);
        let mut selector = Fixed {
            answer: 0,
            asked: Vec::new(),
        };

        let err = plan(
            &mirror,
            DatFile::parse(DAT).unwrap(),
            ResolveOptions::default(),
            DuplicatePolicy::default(),
            &mut selector,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_listing() {
        let mut server = mockito::Server::new_async().await;
        let root = server
            .mock("GET", "/files/")
            .expect(0)
            .create_async()
            .await;
        let mirror = mirror_for(&server);
        let token = CancellationToken::new();
        token.cancel();
        let mut selector = Fixed {
            answer: 0,
            asked: Vec::new(),
        };

        let err = plan(
            &mirror,
            DatFile::parse(DAT).unwrap(),
            ResolveOptions::default(),
            DuplicatePolicy::default(),
            &mut selector,
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        root.assert_async().await;
    }
}
