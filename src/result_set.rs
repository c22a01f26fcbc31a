use crate::error::Result;
use serde_json::Value;

/// Hypermedia navigation links of a collection page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub self_href: Option<String>,
    pub first: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub last: Option<String>,
}

impl Links {
    /// Read `_links` of a HAL document. A relation given as an array uses
    /// its first entry.
    fn from_hal(links: &Value) -> Self {
        let href = |rel: &str| -> Option<String> {
            let link = links.get(rel)?;
            let link = match link {
                Value::Array(entries) => entries.first()?,
                other => other,
            };
            link.get("href")?.as_str().map(|s| s.to_string())
        };

        Links {
            self_href: href("self"),
            first: href("first"),
            prev: href("prev"),
            next: href("next"),
            last: href("last"),
        }
    }
}

/// Paging counters reported alongside a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<u64>,
    pub page_count: Option<u64>,
    pub page_size: Option<u64>,
    pub total_items: Option<u64>,
}

impl Pagination {
    fn from_hal(document: &Value) -> Option<Self> {
        let field = |name: &str| document.get(name).and_then(Value::as_u64);
        let pagination = Pagination {
            page: field("page"),
            page_count: field("page_count"),
            page_size: field("page_size"),
            total_items: field("total_items"),
        };

        if pagination == Pagination::default() {
            None
        } else {
            Some(pagination)
        }
    }
}

/// Fetched entities, single or many, with optional paging metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    items: Vec<Value>,
    links: Links,
    pagination: Option<Pagination>,
}

impl ResultSet {
    pub fn new(items: Vec<Value>) -> Self {
        ResultSet {
            items,
            ..Default::default()
        }
    }

    pub fn single(item: Value) -> Self {
        Self::new(vec![item])
    }

    /// Build from a HAL collection document.
    ///
    /// Entities are read from `_embedded[collection_key]`, or from the only
    /// embedded relation when that key is absent. A document without
    /// `_embedded` is an empty page. Returns `None` when the embedded
    /// entities cannot be located.
    pub fn from_hal(document: &Value, collection_key: &str) -> Option<Self> {
        let items = match document.get("_embedded") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(embedded)) => {
                let entities = match embedded.get(collection_key) {
                    Some(entities) => entities,
                    None if embedded.len() == 1 => embedded.values().next()?,
                    None => return None,
                };
                match entities {
                    Value::Array(items) => items.clone(),
                    Value::Object(_) => vec![entities.clone()],
                    _ => return None,
                }
            }
            Some(_) => return None,
        };

        Some(ResultSet {
            items,
            links: document.get("_links").map(Links::from_hal).unwrap_or_default(),
            pagination: Pagination::from_hal(document),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn first(&self) -> Option<&Value> {
        self.items.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn pagination(&self) -> Option<&Pagination> {
        self.pagination.as_ref()
    }

    pub fn has_next(&self) -> bool {
        self.links.next.is_some()
    }

    /// Unmarshal every entity into the target type
    pub fn deserialize<T>(&self) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        self.items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(|e| e.into()))
            .collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
