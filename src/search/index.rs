//! Per-field text index over restaurant records

use crate::models::{Restaurant, SearchField};
use crate::search::document::{build_restaurant_schema, SearchDocument, ID_FIELD};
use crate::search::error::{SearchError, SearchResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use uuid::Uuid;

/// In-RAM Tantivy index with one text field per searchable attribute.
///
/// Writes commit and reload the reader before returning, so a restaurant is
/// searchable as soon as `index_restaurant` succeeds.
pub struct TextIndex {
    index: Index,
    schema: Schema,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    id_field: Field,
    fields: HashMap<SearchField, Field>,
}

impl TextIndex {
    pub fn new(writer_heap_size: usize) -> SearchResult<Self> {
        let schema = build_restaurant_schema();
        let index = Index::create_in_ram(schema.clone());

        let writer = index
            .writer(writer_heap_size)
            .map_err(|e| SearchError::Open(format!("Failed to create writer: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::Open(format!("Failed to create reader: {}", e)))?;

        let id_field = schema
            .get_field(ID_FIELD)
            .map_err(|e| SearchError::Schema(e.to_string()))?;

        let mut fields = HashMap::with_capacity(SearchField::ALL.len());
        for search_field in SearchField::ALL {
            let field = schema
                .get_field(&search_field.to_string())
                .map_err(|e| SearchError::Schema(e.to_string()))?;
            fields.insert(search_field, field);
        }

        Ok(Self {
            index,
            schema,
            writer: Mutex::new(writer),
            reader,
            id_field,
            fields,
        })
    }

    /// Index (or re-index) a single restaurant
    pub fn index_restaurant(&self, restaurant: &Restaurant) -> SearchResult<()> {
        self.index_restaurants(std::slice::from_ref(restaurant))
            .map(|_| ())
    }

    /// Index a batch of restaurants with a single commit
    pub fn index_restaurants(&self, restaurants: &[Restaurant]) -> SearchResult<usize> {
        if restaurants.is_empty() {
            return Ok(0);
        }

        let mut writer = self.writer.lock();
        for restaurant in restaurants {
            // Replace any previous version of the document
            writer.delete_term(Term::from_field_text(
                self.id_field,
                &restaurant.document_id(),
            ));
            writer
                .add_document(restaurant.to_tantivy_doc(&self.schema))
                .map_err(|e| {
                    SearchError::Write(format!("Failed to add {}: {}", restaurant.id, e))
                })?;
        }

        writer
            .commit()
            .map_err(|e| SearchError::Write(format!("Failed to commit: {}", e)))?;
        drop(writer);

        self.reader.reload()?;
        Ok(restaurants.len())
    }

    /// Remove a restaurant from the index
    pub fn remove(&self, id: &Uuid) -> SearchResult<()> {
        let mut writer = self.writer.lock();
        writer.delete_term(Term::from_field_text(self.id_field, &id.to_string()));
        writer
            .commit()
            .map_err(|e| SearchError::Write(format!("Failed to commit deletion: {}", e)))?;
        drop(writer);

        self.reader.reload()?;
        Ok(())
    }

    /// Search a single field, returning matching ids ordered by relevance.
    ///
    /// Any query term may match; the final term also matches as a prefix.
    pub fn search(&self, field: SearchField, query: &str, limit: usize) -> SearchResult<Vec<Uuid>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let field = self.fields[&field];
        let terms = self.tokenize(field, query)?;
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let last = terms.len() - 1;
        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let term = Term::from_field_text(field, &text);
                let exact: Box<dyn Query> =
                    Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs));
                let clause: Box<dyn Query> = if i == last {
                    Box::new(BooleanQuery::new(vec![
                        (Occur::Should, exact),
                        (
                            Occur::Should,
                            Box::new(FuzzyTermQuery::new_prefix(term, 0, true)),
                        ),
                    ]))
                } else {
                    exact
                };
                (Occur::Should, clause)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(limit))
            .map_err(|e| SearchError::Query(e.to_string()))?;

        let mut ids = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchError::Query(format!("Failed to retrieve doc: {}", e)))?;
            if let Some(id) = doc
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    /// Number of indexed restaurants
    pub fn num_docs(&self) -> SearchResult<usize> {
        let searcher = self.reader.searcher();
        searcher
            .search(&AllQuery, &Count)
            .map_err(|e| SearchError::Query(e.to_string()))
    }

    fn tokenize(&self, field: Field, text: &str) -> SearchResult<Vec<String>> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            let token = stream.token().text.clone();
            if !terms.contains(&token) {
                terms.push(token);
            }
        }
        Ok(terms)
    }
}
