/// Query pipeline builder
///
/// Translates a parsed HTTP query string into a filtered, sorted,
/// field-limited, paginated description of a find against one collection.
/// No I/O happens here; the store executes the resulting `FindOptions`.

mod predicate;

pub use predicate::{Comparison, Filter, Predicate, compare_values};

use std::collections::HashMap;

/// Flat query-string map, taken verbatim from the request
pub type QueryRequest = HashMap<String, String>;

/// Keys that drive pipeline stages and are never filter predicates
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Document identifier field
pub const ID_FIELD: &str = "_id";

/// Internal version field, excluded by the default projection
pub const VERSION_FIELD: &str = "__v";

/// Creation timestamp field, the default sort key
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Page size applied when the request carries no usable `limit`
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Upper bound on the page size a client may request
pub const MAX_PAGE_SIZE: usize = 1000;

/// Sort order for one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One field of a multi-key sort, in precedence order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

/// Field projection: an explicit inclusion list or an exclusion list.
///
/// The two forms are never mixed; the default excludes only the internal
/// version field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Exclude(vec![VERSION_FIELD.to_string()])
    }
}

/// Fully described find: what the store executes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Chainable query pipeline builder.
///
/// Constructed from a base filter (hidden-document exclusions plus any
/// route-injected predicates) and a borrowed query-string map. Each stage
/// rewrites one aspect of the held `FindOptions` and returns the builder;
/// the canonical order is filter → sorting → limit_fields → paginate.
/// The request map is never mutated.
#[derive(Debug)]
pub struct ApiQuery<'a> {
    request: &'a QueryRequest,
    base: Filter,
    options: FindOptions,
}

impl<'a> ApiQuery<'a> {
    pub fn new(request: &'a QueryRequest, base: Filter) -> Self {
        let options = FindOptions {
            filter: base.clone(),
            ..FindOptions::default()
        };
        Self {
            request,
            base,
            options,
        }
    }

    /// Translate non-reserved request keys into the find's filter.
    ///
    /// Idempotent: the stage assigns the combined base + request filter, so
    /// running it twice yields the same predicate list as running it once.
    pub fn filter(mut self) -> Self {
        self.options.filter = self.base.and(&Filter::from_request(self.request));
        self
    }

    /// Apply the `sort` directive, or the default creation-time descending.
    ///
    /// `sort=-price,name` sorts by price descending, ties broken by name
    /// ascending; left-to-right precedence is preserved.
    pub fn sorting(mut self) -> Self {
        let keys: Vec<SortKey> = self
            .request
            .get("sort")
            .map(|spec| {
                spec.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty() && *part != "-")
                    .map(|part| match part.strip_prefix('-') {
                        Some(field) => SortKey {
                            field: field.to_string(),
                            order: SortOrder::Descending,
                        },
                        None => SortKey {
                            field: part.to_string(),
                            order: SortOrder::Ascending,
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.options.sort = if keys.is_empty() {
            vec![SortKey {
                field: CREATED_AT_FIELD.to_string(),
                order: SortOrder::Descending,
            }]
        } else {
            keys
        };
        self
    }

    /// Apply the `fields` projection, or the default `__v` exclusion.
    ///
    /// An inclusion list always carries the identifier as well.
    pub fn limit_fields(mut self) -> Self {
        let fields: Vec<String> = self
            .request
            .get("fields")
            .map(|spec| {
                spec.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        self.options.projection = if fields.is_empty() {
            Projection::default()
        } else {
            let mut fields = fields;
            if !fields.iter().any(|f| f == ID_FIELD) {
                fields.push(ID_FIELD.to_string());
            }
            Projection::Include(fields)
        };
        self
    }

    /// Compute skip/limit from `page` and `limit`.
    ///
    /// `page` defaults to 1 and floors at 1; `limit` defaults to 100 and is
    /// capped at `MAX_PAGE_SIZE`. Unparseable values fall back to the
    /// defaults.
    pub fn paginate(mut self) -> Self {
        let page = self
            .request
            .get("page")
            .and_then(|raw| raw.parse::<usize>().ok())
            .map(|page| page.max(1))
            .unwrap_or(1);

        let limit = self
            .request
            .get("limit")
            .and_then(|raw| raw.parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        // Saturate: a huge page must clamp, not overflow
        self.options.skip = page.saturating_sub(1).saturating_mul(limit);
        self.options.limit = Some(limit);
        self
    }

    /// Finish the pipeline and hand the find description to the caller
    pub fn into_options(self) -> FindOptions {
        self.options
    }
}
