//! Shared test fixtures and utilities for integration tests.
//!
//! # Fixture registry
//!
//! [`REGISTRY`] is a two-extension registry document in the shape served by the
//! extension registry. Record order after extraction:
//!
//! | doc | kind  | extension | path / code                  |
//! |-----|-------|-----------|------------------------------|
//! | 0   | field | bids      | `Tender.numberOfTenderers`   |
//! | 1   | field | bids      | `BidsStatistic`              |
//! | 2   | field | bids      | `BidsStatistic.measure`      |
//! | 3   | field | bids      | `BidsStatistic.value`        |
//! | 4   | field | bids      | `bids`                       |
//! | 5   | field | bids      | `bids.statistics`            |
//! | 6   | code  | bids      | `requests`                   |
//! | 7   | code  | bids      | `disqualifiedBids`           |
//! | 8   | field | lots      | `Lot`                        |
//! | 9   | field | lots      | `Lot.id`                     |
//! | 10  | field | lots      | `tender.lots`                |
//!
//! # Available Fixtures
//!
//! - `registry`: the parsed fixture document
//! - `index`: a [`SearchIndex`] built from it (generation 1)
//! - `ready_state`: an initialized [`IndexState`] over a [`StaticSource`]

use extension_search::{
    ExtractOptions, IndexState, Registry, RegistrySource, SearchIndex, StaticSource,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use rstest::fixture;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const REGISTRY: &str = r##"{
  "bids": {
    "name": {"en": "Bid statistics and details", "es": "Estadísticas y detalles de ofertas"},
    "latest_version": "v1.1.5",
    "versions": {
      "v1.1.4": {"schemas": {}},
      "v1.1.5": {
        "schemas": {
          "release-schema.json": {
            "en": {
              "definitions": {
                "Tender": {
                  "properties": {
                    "numberOfTenderers": {
                      "title": "Number of tenderers",
                      "description": "The number of parties who submit a **bid**.",
                      "type": ["integer", "null"]
                    }
                  }
                },
                "BidsStatistic": {
                  "title": "Bid statistic",
                  "type": "object",
                  "properties": {
                    "measure": {
                      "title": "Measure",
                      "description": "The statistic reported, from the [statistic](https://example.org) codelist.",
                      "type": ["string", "null"],
                      "codelist": "statistic.csv"
                    },
                    "value": {"title": "Value", "type": ["number", "null"]}
                  }
                }
              },
              "properties": {
                "bids": {
                  "title": "Bids",
                  "type": "object",
                  "properties": {
                    "statistics": {
                      "title": "Statistics",
                      "type": "array",
                      "items": {"$ref": "#/definitions/BidsStatistic"}
                    }
                  }
                }
              }
            }
          }
        },
        "codelists": {
          "statistic.csv": {
            "en": {
              "rows": [
                {"Code": "requests", "Title": "Requests to participate", "Description": "The number of requests to participate received."},
                {"Code": "disqualifiedBids", "Title": "Disqualified bids", "Description": "The number of bids disqualified."}
              ]
            }
          }
        }
      }
    }
  },
  "lots": {
    "name": {"en": "Lots"},
    "latest_version": "v1.1.5",
    "versions": {
      "v1.1.5": {
        "schemas": {
          "release-schema.json": {
            "en": {
              "definitions": {
                "Lot": {
                  "title": "Lot",
                  "description": "A lot within a tender.",
                  "type": "object",
                  "properties": {"id": {"title": "Lot ID", "type": ["string", "integer"]}}
                }
              },
              "properties": {
                "tender": {
                  "properties": {
                    "lots": {"title": "Lots", "type": "array", "items": {"$ref": "#/definitions/Lot"}}
                  }
                }
              }
            }
          }
        }
      }
    }
  }
}"##;

/// A second registry snapshot: `lots` removed, one code added to `bids`.
pub const REGISTRY_UPDATED: &str = r##"{
  "bids": {
    "name": {"en": "Bid statistics and details"},
    "latest_version": "v1.2.0",
    "versions": {
      "v1.2.0": {
        "codelists": {
          "statistic.csv": {
            "en": {"rows": [{"Code": "electronicBids", "Title": "Electronic bids", "Description": ""}]}
          }
        }
      }
    }
  }
}"##;

#[fixture]
pub fn registry() -> Registry {
    Registry::from_slice(REGISTRY.as_bytes()).expect("fixture registry parses")
}

#[fixture]
pub fn index(registry: Registry) -> SearchIndex {
    SearchIndex::from_registry(&registry, &ExtractOptions::default(), 1)
}

/// A state whose first build has completed.
#[fixture]
pub async fn ready_state() -> Arc<IndexState> {
    let state = Arc::new(IndexState::new(
        Arc::new(StaticSource::new("fixture", REGISTRY)),
        ExtractOptions::default(),
    ));
    state.initialize().await.expect("fixture index builds");
    state
}

/// Paths or codes of records, for compact assertions.
#[allow(dead_code)] // Used across different integration test crates
pub fn labels<'a>(records: impl IntoIterator<Item = &'a extension_search::Record>) -> Vec<String> {
    records
        .into_iter()
        .map(|record| match record {
            extension_search::Record::Field(field) => field.path.clone(),
            extension_search::Record::Code(code) => code.code.clone(),
        })
        .collect()
}

/// A registry document on disk, removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempRegistry {
    _temp: TempDir,
    path: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempRegistry {
    pub fn new(content: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().join("extensions.json");
        std::fs::write(&path, content).expect("Failed to write registry file");
        Self { _temp: temp, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the document, as a registry publish would.
    pub fn update(&self, content: &str) {
        std::fs::write(&self.path, content).expect("Failed to update registry file");
    }
}

/// Source that replays scripted responses, each after an optional delay, and counts fetches.
///
/// Once the script runs out the last response repeats.
#[allow(dead_code)] // Used across different integration test crates
#[derive(Debug)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<(Duration, String)>>,
    last: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = (Duration, &'static str)>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|(delay, body)| (delay, body.to_string()))
                    .collect(),
            ),
            last: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RegistrySource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn fetch(&self) -> BoxFuture<'_, anyhow::Result<Vec<u8>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let (delay, body) = match next {
            Some((delay, body)) => {
                *self.last.lock().unwrap() = Some(body.clone());
                (delay, body)
            }
            None => (
                Duration::ZERO,
                self.last.lock().unwrap().clone().unwrap_or_default(),
            ),
        };

        async move {
            tokio::time::sleep(delay).await;
            Ok(body.into_bytes())
        }
        .boxed()
    }
}
