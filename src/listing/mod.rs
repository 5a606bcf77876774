//! Client-side listing pipeline: search filter, role filter, sort, paginate.
//!
//! [`compute_view`] is a pure function over the raw record collection and the
//! current [`QueryState`]; the caller re-invokes it on every change to either
//! input. It never fails and never touches the network, so a front-end can
//! recompute per keystroke.

use serde::Deserialize;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::{Role, UserRecord};

/// Rows per page used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// How search text is matched against a record.
///
/// `StartsWith` (the primary policy) matches a record whose name or email
/// local part starts with the needle; `Contains` matches anywhere in the full
/// name or email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPolicy {
    StartsWith,
    Contains,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        SearchPolicy::StartsWith
    }
}

/// Role filter for the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFilter {
    All,
    Only(Role),
}

impl RoleFilter {
    fn matches(&self, role: Role) -> bool {
        match self {
            RoleFilter::All => true,
            RoleFilter::Only(wanted) => role == *wanted,
        }
    }
}

impl Default for RoleFilter {
    fn default() -> Self {
        RoleFilter::All
    }
}

impl FromStr for RoleFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RoleFilter::All),
            other => other.parse::<Role>().map(RoleFilter::Only),
        }
    }
}

/// Field the listing is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Email,
    Role,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Name
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "email" => Ok(SortKey::Email),
            "role" => Ok(SortKey::Role),
            other => Err(format!(
                "Unknown sort key: {} (expected name, email or role)",
                other
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Asc
    }
}

/// Query state driving the listing pipeline.
///
/// Mutators enforce the page-reset policy: changing the search text or the
/// role filter resets the page to 1, changing the sort does not.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    search_text: String,
    role_filter: RoleFilter,
    sort_key: SortKey,
    sort_direction: SortDirection,
    page: usize,
    page_size: usize,
    search_policy: SearchPolicy,
}

impl QueryState {
    pub fn new(page_size: usize, search_policy: SearchPolicy) -> Self {
        Self {
            search_text: String::new(),
            role_filter: RoleFilter::All,
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            page_size: page_size.max(1),
            search_policy,
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn role_filter(&self) -> RoleFilter {
        self.role_filter
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Change the search text; resets the page to 1.
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.page = 1;
    }

    /// Change the role filter; resets the page to 1.
    pub fn set_role_filter(&mut self, filter: RoleFilter) {
        self.role_filter = filter;
        self.page = 1;
    }

    /// Sort by the given key. Selecting the current key toggles the
    /// direction; a new key starts ascending. The page is kept.
    pub fn sort_by(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_key = key;
            self.sort_direction = SortDirection::Asc;
        }
    }

    /// Set the sort key and direction explicitly. The page is kept.
    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.sort_key = key;
        self.sort_direction = direction;
    }

    /// Request a page. Values below 1 are clamped to 1; pages beyond the
    /// current result are clamped back to 1 at view-computation time.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }
}

/// One computed page of the listing plus pagination metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ListingView<'a> {
    /// Visible rows for the effective page
    pub rows: Vec<&'a UserRecord>,
    /// Records surviving both filters
    pub total_matched: usize,
    /// At least 1, even for an empty match set
    pub total_pages: usize,
    /// The page actually used for slicing
    pub current_page: usize,
}

/// Run the full pipeline: search filter, role filter, stable sort, paginate.
///
/// Referentially transparent: identical inputs yield an identical view.
pub fn compute_view<'a>(records: &'a [UserRecord], query: &QueryState) -> ListingView<'a> {
    let needle = query.search_text.trim().to_lowercase();

    let mut matched: Vec<&UserRecord> = records
        .iter()
        .filter(|user| matches_search(user, &needle, query.search_policy))
        .filter(|user| query.role_filter.matches(user.role))
        .collect();

    // Vec::sort_by is stable; descending order reverses the comparator, not
    // the sorted output, so ties keep their prior relative order either way.
    matched.sort_by(|a, b| {
        let ordering = compare_by_key(a, b, query.sort_key);
        match query.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    let total_matched = matched.len();
    let total_pages = (total_matched.div_ceil(query.page_size)).max(1);

    // A page that fell out of range (a filter narrowed the results) snaps
    // back to 1, matching the reset-on-change policy.
    let current_page = if query.page > total_pages {
        1
    } else {
        query.page
    };

    let start = (current_page - 1) * query.page_size;
    let rows = matched
        .into_iter()
        .skip(start)
        .take(query.page_size)
        .collect();

    ListingView {
        rows,
        total_matched,
        total_pages,
        current_page,
    }
}

/// An empty needle matches every record.
fn matches_search(user: &UserRecord, needle: &str, policy: SearchPolicy) -> bool {
    if needle.is_empty() {
        return true;
    }

    let name = user.name.to_lowercase();
    let email = user.email.to_lowercase();

    match policy {
        SearchPolicy::StartsWith => {
            let email_local = email.split('@').next().unwrap_or("");
            name.starts_with(needle) || email_local.starts_with(needle)
        }
        SearchPolicy::Contains => name.contains(needle) || email.contains(needle),
    }
}

/// Case-insensitive comparison on the string representation of the sort key.
fn compare_by_key(a: &UserRecord, b: &UserRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        SortKey::Role => a.role.as_str().cmp(b.role.as_str()),
    }
}
