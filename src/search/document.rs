//! Search document structures and schema

use crate::models::{Restaurant, SearchField};
use tantivy::schema::*;
use tantivy::TantivyDocument;

/// Name of the stored identifier field
pub const ID_FIELD: &str = "id";

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument;

    /// Get document ID
    fn document_id(&self) -> String;
}

impl SearchDocument for Restaurant {
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        if let Ok(field) = schema.get_field(ID_FIELD) {
            doc.add_text(field, self.document_id());
        }

        // One independently searchable text field per bilingual attribute
        for search_field in SearchField::ALL {
            if let Ok(field) = schema.get_field(&search_field.to_string()) {
                doc.add_text(field, self.field_text(search_field));
            }
        }

        doc
    }

    fn document_id(&self) -> String {
        self.id.to_string()
    }
}

/// Build the restaurant text schema
pub fn build_restaurant_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    // ID - stored, indexed as a single token
    schema_builder.add_text_field(ID_FIELD, STRING | STORED);

    // Text fields are indexed only; hits are hydrated from the entity store
    for search_field in SearchField::ALL {
        schema_builder.add_text_field(&search_field.to_string(), TEXT);
    }

    schema_builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRestaurant;

    #[test]
    fn test_schema_has_every_search_field() {
        let schema = build_restaurant_schema();
        assert!(schema.get_field(ID_FIELD).is_ok());
        for field in SearchField::ALL {
            assert!(schema.get_field(&field.to_string()).is_ok(), "{field}");
        }
    }

    #[test]
    fn test_document_carries_id() {
        let schema = build_restaurant_schema();
        let restaurant = Restaurant::from_import(NewRestaurant {
            name: "Miznon".to_string(),
            ..Default::default()
        });

        let doc = restaurant.to_tantivy_doc(&schema);
        let id_field = schema.get_field(ID_FIELD).unwrap();
        let stored = doc.get_first(id_field).and_then(|v| v.as_str());
        assert_eq!(stored, Some(restaurant.id.to_string().as_str()));
    }
}
