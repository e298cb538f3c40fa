//! The catalog's schema generations, declared once as data.
//!
//! Input schemas describe what callers submit; stored schemas are what the
//! store enforces on commit. In the current generation the product's photo
//! links (`photos`, `photos_all`, `cover_photo`) are derived from the
//! Photo collection's `product_id` back-reference and are therefore absent
//! from the stored product schema.

use std::collections::BTreeMap;

use crate::schema::{DocumentSchema, FieldType, ObjectSchema, SchemaDef, UnionBranch, UnionSchema};

/// The schema bundle a catalog store is wired with.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSchemas {
    pub product_input: SchemaDef,
    pub product_stored: SchemaDef,
    pub photo_input: SchemaDef,
    pub photo_stored: SchemaDef,
}

impl CatalogSchemas {
    /// The latest generation of every schema.
    pub fn latest() -> Self {
        Self {
            product_input: product_input_schema(),
            product_stored: product_stored_schema(),
            photo_input: photo_input_schema(),
            photo_stored: photo_stored_schema(),
        }
    }
}

fn product_scalar_properties() -> BTreeMap<String, FieldType> {
    let mut props = BTreeMap::new();
    props.insert("_id".to_string(), FieldType::Any);
    props.insert("expose".to_string(), FieldType::Bool);
    props.insert("name".to_string(), FieldType::string(3, 150));
    props.insert("price".to_string(), FieldType::number(0.0, 1_000_000.0));
    props.insert("is_in_stock".to_string(), FieldType::Bool);
    props.insert("description".to_string(), FieldType::string(1, 15_000));
    props.insert("time".to_string(), FieldType::plain_string());
    props
}

/// What callers submit when creating a product. A union on `expose`: an
/// exposed product must arrive complete, an unexposed one only needs the
/// discriminator itself.
pub fn product_input_schema() -> SchemaDef {
    let mut props = product_scalar_properties();
    props.insert(
        "photos_all".to_string(),
        FieldType::array(1, 500, FieldType::Reference),
    );
    props.insert(
        "photos".to_string(),
        FieldType::array(1, 150, FieldType::Reference),
    );
    props.insert("cover_photo".to_string(), FieldType::Reference);

    SchemaDef::new(
        "product",
        "2",
        DocumentSchema::Union(UnionSchema {
            discriminator: "expose".to_string(),
            branches: vec![
                UnionBranch {
                    discriminator_value: true,
                    schema: ObjectSchema::new(
                        props.clone(),
                        &[
                            "expose",
                            "name",
                            "price",
                            "is_in_stock",
                            "photos",
                            "cover_photo",
                            "description",
                        ],
                    ),
                },
                UnionBranch {
                    discriminator_value: false,
                    schema: ObjectSchema::new(props, &["expose"]),
                },
            ],
        }),
    )
}

/// What the product collection enforces. Photo links are derived, so only
/// scalar attributes are stored; an exposed product must carry them all.
pub fn product_stored_schema() -> SchemaDef {
    let props = product_scalar_properties();

    SchemaDef::new(
        "product",
        "2",
        DocumentSchema::Union(UnionSchema {
            discriminator: "expose".to_string(),
            branches: vec![
                UnionBranch {
                    discriminator_value: true,
                    schema: ObjectSchema::new(
                        props.clone(),
                        &["_id", "expose", "name", "price", "is_in_stock", "description"],
                    ),
                },
                UnionBranch {
                    discriminator_value: false,
                    schema: ObjectSchema::new(props, &["_id", "expose"]),
                },
            ],
        }),
    )
}

/// What callers submit when attaching a photo.
pub fn photo_input_schema() -> SchemaDef {
    let mut props = BTreeMap::new();
    props.insert("_id".to_string(), FieldType::Any);
    props.insert("path".to_string(), FieldType::string(1, 1000));

    SchemaDef::new(
        "photo",
        "1",
        DocumentSchema::Object(ObjectSchema::new(props, &["path"])),
    )
}

/// What the photo collection enforces. A union on `public`: a public
/// photo must carry its display `order`, a private one need not.
pub fn photo_stored_schema() -> SchemaDef {
    let mut props = BTreeMap::new();
    props.insert("_id".to_string(), FieldType::Any);
    props.insert("product_id".to_string(), FieldType::Reference);
    props.insert("path".to_string(), FieldType::string(1, 1000));
    props.insert("public".to_string(), FieldType::Bool);
    props.insert("cover".to_string(), FieldType::Bool);
    props.insert("order".to_string(), FieldType::Int);

    SchemaDef::new(
        "photo",
        "2",
        DocumentSchema::Union(UnionSchema {
            discriminator: "public".to_string(),
            branches: vec![
                UnionBranch {
                    discriminator_value: false,
                    schema: ObjectSchema::new(
                        props.clone(),
                        &["_id", "product_id", "path", "public", "cover"],
                    ),
                },
                UnionBranch {
                    discriminator_value: true,
                    schema: ObjectSchema::new(
                        props,
                        &["_id", "product_id", "path", "public", "cover", "order"],
                    ),
                },
            ],
        }),
    )
}
