use std::collections::BTreeMap;

/// Query parameters forwarded to the API, in a stable order
pub type Params = BTreeMap<String, String>;

/// The two upstream endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `lawSearch.do`: paged listings
    Search,
    /// `lawService.do`: a single document by `ID` or `MST`
    Service,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Service => "service",
        }
    }
}
