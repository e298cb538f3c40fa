//! Catalog Consistency Invariant Tests
//!
//! Cross-document invariants between products and their photos:
//! - An exposed product always has at least one public photo and a cover
//! - Photo removal, publicity changes and cover changes that break the
//!   exposure preconditions clear `expose` in the same transaction
//! - Publicity changes are idempotent and append at the end of the order
//! - A product has at most one cover photo

use merchdb::catalog::{
    CatalogError, CatalogStore, PhotoDraft, PhotoOrder, PublicityChange, UpdateSpec,
};
use merchdb::config::CatalogConfig;
use merchdb::report::ErrorKind;
use merchdb::store::Datastore;
use serde_json::{json, Map};

// =============================================================================
// Helper Functions
// =============================================================================

fn catalog() -> CatalogStore {
    init_tracing();
    CatalogStore::open(Datastore::new(), CatalogConfig::default()).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn full_product(catalog: &CatalogStore) -> String {
    catalog
        .create(&json!({
            "expose": false,
            "name": "walnut desk",
            "price": 420.5,
            "is_in_stock": true,
            "description": "a desk"
        }))
        .unwrap()
        .to_string()
}

fn attach(catalog: &CatalogStore, product: &str, paths: &[&str]) -> Vec<String> {
    let drafts: Vec<PhotoDraft> = paths
        .iter()
        .map(|p| PhotoDraft { path: p.to_string() })
        .collect();
    catalog
        .add_photos(product, &drafts)
        .unwrap()
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

fn publicize(catalog: &CatalogStore, product: &str, ids: &[String]) {
    let changes: Vec<PublicityChange> = ids
        .iter()
        .map(|id| PublicityChange { id: id.clone(), public: true })
        .collect();
    catalog.update_photos_publicity(product, &changes).unwrap();
}

fn expose(catalog: &CatalogStore, product: &str) -> Result<bool, CatalogError> {
    let mut write = Map::new();
    write.insert("expose".to_string(), json!(true));
    catalog.update(product, &UpdateSpec { write: Some(write), remove: None })
}

fn is_exposed(catalog: &CatalogStore, product: &str) -> bool {
    catalog.get_by_id(product).unwrap().unwrap().expose
}

// =============================================================================
// Exposure Precondition Tests
// =============================================================================

/// Exposing requires both a public photo and a cover.
#[test]
fn test_expose_needs_public_photo_and_cover() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg"]);

    // photo exists but is private and not the cover
    assert!(matches!(
        expose(&catalog, &product).unwrap_err(),
        CatalogError::Validation { .. }
    ));

    publicize(&catalog, &product, &ids);
    // public but still no cover
    assert!(matches!(
        expose(&catalog, &product).unwrap_err(),
        CatalogError::Validation { .. }
    ));

    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    assert!(expose(&catalog, &product).unwrap());
    assert!(is_exposed(&catalog, &product));
}

/// Removing the last public photo clears `expose` atomically.
#[test]
fn test_removing_last_public_photo_clears_expose() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg"]);
    publicize(&catalog, &product, &ids[..1].to_vec());
    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    expose(&catalog, &product).unwrap();

    catalog.remove_photos(&product, &ids[..1].to_vec()).unwrap();

    assert!(!is_exposed(&catalog, &product));
    // the private photo is untouched
    assert_eq!(catalog.photos(&product).unwrap().len(), 1);
}

/// Removing a photo that leaves the preconditions intact leaves `expose`
/// alone.
#[test]
fn test_partial_removal_keeps_expose() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg"]);
    publicize(&catalog, &product, &ids);
    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    expose(&catalog, &product).unwrap();

    catalog.remove_photos(&product, &ids[1..].to_vec()).unwrap();
    assert!(is_exposed(&catalog, &product));
}

/// Hiding every public photo clears `expose`.
#[test]
fn test_hiding_all_public_photos_clears_expose() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg"]);
    publicize(&catalog, &product, &ids);
    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    expose(&catalog, &product).unwrap();

    catalog
        .update_photos_publicity(
            &product,
            &[PublicityChange { id: ids[0].clone(), public: false }],
        )
        .unwrap();

    assert!(!is_exposed(&catalog, &product));
    let photo = &catalog.photos(&product).unwrap()[0];
    assert!(!photo.public);
    assert_eq!(photo.order, None);
}

/// Unmarking the cover clears `expose` on an exposed product.
#[test]
fn test_unmarking_cover_clears_expose() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg"]);
    publicize(&catalog, &product, &ids);
    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    expose(&catalog, &product).unwrap();

    catalog.set_cover_photo(&product, &ids[0], false).unwrap();
    assert!(!is_exposed(&catalog, &product));
}

// =============================================================================
// Publicity and Ordering Tests
// =============================================================================

/// Publishing an already public photo changes nothing, including its
/// position in the order.
#[test]
fn test_publicity_is_idempotent() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg"]);
    publicize(&catalog, &product, &ids);

    let before = catalog.photos(&product).unwrap();
    publicize(&catalog, &product, &ids[..1].to_vec());
    assert_eq!(catalog.photos(&product).unwrap(), before);
}

/// A photo regaining publicity is appended at the end of the order, not
/// restored to its old slot.
#[test]
fn test_republished_photo_appends_at_the_end() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg", "c.jpg"]);
    publicize(&catalog, &product, &ids);

    catalog
        .update_photos_publicity(
            &product,
            &[PublicityChange { id: ids[0].clone(), public: false }],
        )
        .unwrap();
    catalog
        .update_photos_publicity(
            &product,
            &[PublicityChange { id: ids[0].clone(), public: true }],
        )
        .unwrap();

    let photos = catalog.photos(&product).unwrap();
    let last_public = photos.iter().filter(|p| p.public).last().unwrap();
    assert_eq!(last_public.id.to_string(), ids[0]);
    assert_eq!(last_public.order, Some(3));
}

/// A reorder must name exactly the product's public photos; a partial
/// request fails and leaves every order untouched.
#[test]
fn test_partial_reorder_is_rejected_without_effect() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg"]);
    publicize(&catalog, &product, &ids);
    let before = catalog.photos(&product).unwrap();

    let err = catalog
        .reorder_photos(&product, &[PhotoOrder { id: ids[0].clone(), order: 9 }])
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }));
    assert_eq!(catalog.photos(&product).unwrap(), before);
}

/// A complete reorder applies every position.
#[test]
fn test_full_reorder_applies() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg"]);
    publicize(&catalog, &product, &ids);

    catalog
        .reorder_photos(
            &product,
            &[
                PhotoOrder { id: ids[0].clone(), order: 1 },
                PhotoOrder { id: ids[1].clone(), order: 0 },
            ],
        )
        .unwrap();

    let photos = catalog.photos(&product).unwrap();
    assert_eq!(photos[0].id.to_string(), ids[1]);
    assert_eq!(photos[1].id.to_string(), ids[0]);
}

// =============================================================================
// Cover Photo Tests
// =============================================================================

/// Marking a new cover unmarks the previous one in the same transaction.
#[test]
fn test_single_cover_invariant() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let ids = attach(&catalog, &product, &["a.jpg", "b.jpg"]);

    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    catalog.set_cover_photo(&product, &ids[1], true).unwrap();

    let covers: Vec<_> = catalog
        .photos(&product)
        .unwrap()
        .into_iter()
        .filter(|p| p.cover)
        .collect();
    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].id.to_string(), ids[1]);
}

/// A foreign photo can never become a product's cover.
#[test]
fn test_cover_rejects_foreign_photo() {
    let catalog = catalog();
    let product = full_product(&catalog);
    let other = full_product(&catalog);
    let foreign = attach(&catalog, &other, &["x.jpg"]);

    let err = catalog.set_cover_photo(&product, &foreign[0], true).unwrap_err();
    assert_eq!(
        err,
        CatalogError::NotFound("given photo doesn't belong to the given product".into())
    );
}

// =============================================================================
// Optimistic Write Fallback Tests
// =============================================================================

/// A write the store's registered schema rejects triggers a second
/// domain-validation pass that produces a precise field-level report,
/// and the stored document stays untouched.
#[test]
fn test_store_rejection_falls_back_to_field_level_report() {
    let catalog = catalog();
    let product = full_product(&catalog);

    // removing the discriminator violates the stored product schema
    let spec = UpdateSpec {
        write: None,
        remove: Some(vec!["expose".to_string()]),
    };
    let err = catalog.update(&product, &spec).unwrap_err();

    let report = err.report().expect("field-level report");
    assert_eq!(report.field_names(), vec!["expose"]);
    assert_eq!(
        report.field("expose").unwrap().errors[0].kind,
        ErrorKind::FieldMissing
    );

    let stored = catalog.get_by_id(&product).unwrap().unwrap();
    assert!(!stored.expose);
}

/// Writing a field value the stored schema constrains reports on exactly
/// that field.
#[test]
fn test_store_rejection_reports_the_offending_field() {
    let catalog = catalog();
    let product = full_product(&catalog);

    let mut write = Map::new();
    write.insert("price".to_string(), json!(-5));
    let err = catalog
        .update(&product, &UpdateSpec { write: Some(write), remove: None })
        .unwrap_err();

    let report = err.report().expect("field-level report");
    assert_eq!(report.field_names(), vec!["price"]);
    assert_eq!(
        report.field("price").unwrap().errors[0].kind,
        ErrorKind::ValidationError
    );
    // the rejected mutation left the document unchanged
    let stored = catalog.get_by_id(&product).unwrap().unwrap();
    assert_eq!(stored.price, Some(420.5));
}

// =============================================================================
// Full Lifecycle Test
// =============================================================================

/// The whole lifecycle: create, attach, publish, cover, expose, and then
/// lose the cover.
#[test]
fn test_product_lifecycle() {
    let catalog = catalog();
    let product = full_product(&catalog);

    let ids = attach(&catalog, &product, &["front.jpg", "side.jpg"]);
    publicize(&catalog, &product, &ids);
    catalog.set_cover_photo(&product, &ids[0], true).unwrap();
    assert!(expose(&catalog, &product).unwrap());

    // removing the cover photo takes the product off display
    catalog.remove_photos(&product, &ids[..1].to_vec()).unwrap();
    assert!(!is_exposed(&catalog, &product));
    assert_eq!(catalog.photos(&product).unwrap().len(), 1);

    // and it can come back once the preconditions hold again
    catalog.set_cover_photo(&product, &ids[1], true).unwrap();
    assert!(expose(&catalog, &product).unwrap());
    assert!(is_exposed(&catalog, &product));
}
