//! Sort compilation.

use std::fmt;

use fathom_core::{Error, FieldCodec, Result};
use fathom_query::{MissingValue, SortNode};
use serde::Serialize;
use serde_json::{Value, json};

/// A compiled sort element: one entry of the `sort` array.
#[derive(Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ElasticSort(Value);

impl ElasticSort {
    /// The sort entry.
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Whether this element sorts by score.
    pub fn is_score(&self) -> bool {
        self.0.get("_score").is_some()
    }

    /// Compiles a sort element.
    pub fn compile(node: &SortNode) -> Result<Self> {
        let value = match node {
            SortNode::Score { order } => json!({ "_score": { "order": order.to_string() } }),
            SortNode::Field {
                field,
                order,
                missing,
            } => {
                let missing = match missing {
                    MissingValue::First => "_first",
                    MissingValue::Last => "_last",
                };
                json!({
                    field.path(): {
                        "order": order.to_string(),
                        "missing": missing,
                    }
                })
            }
            SortNode::Distance {
                field,
                center,
                order,
            } => {
                let codec = field.codec()?;
                if codec != FieldCodec::GeoPoint {
                    return Err(Error::unsupported(field.path(), "Distance sorts", codec));
                }
                json!({
                    "_geo_distance": {
                        field.path(): { "lat": center.lat, "lon": center.lon },
                        "order": order.to_string(),
                        "unit": "m",
                        "distance_type": "arc",
                    }
                })
            }
        };
        Ok(Self(value))
    }
}

impl fmt::Debug for ElasticSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElasticSort({})", self.0)
    }
}
