//! Zone routing for incoming queries.
//!
//! Configured proxy zones select the interception path; every other name falls
//! through to the root pattern, which always forwards verbatim.

/// Handling path selected for a query name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Intercept,
    Forward,
}

/// A zone in normalized form: lowercase, fully qualified, trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZonePattern(String);

impl ZonePattern {
    pub fn new(raw: &str) -> Self {
        Self(normalize_name(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    pub fn label_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('.').count()
        }
    }

    /// Label-aligned suffix match: `example.com.` contains `a.example.com.`
    /// but not `badexample.com.`.
    pub fn contains(&self, normalized_name: &str) -> bool {
        if self.is_root() || normalized_name == self.0 {
            return true;
        }
        normalized_name
            .strip_suffix(self.0.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// Maps query names to a [`Route`], most specific zone first.
#[derive(Debug, Clone, Default)]
pub struct ZoneRouter {
    zones: Vec<ZonePattern>,
}

impl ZoneRouter {
    /// The root zone is never intercepted, even when listed.
    pub fn new<S: AsRef<str>>(proxy_zones: &[S]) -> Self {
        let mut zones: Vec<ZonePattern> = proxy_zones
            .iter()
            .map(|z| ZonePattern::new(z.as_ref()))
            .filter(|z| !z.is_root())
            .collect();
        zones.sort_by_key(|z| std::cmp::Reverse(z.label_count()));
        zones.dedup();
        Self { zones }
    }

    pub fn zones(&self) -> &[ZonePattern] {
        &self.zones
    }

    /// Most specific configured zone containing `name`.
    pub fn matched_zone(&self, name: &str) -> Option<&ZonePattern> {
        let name = normalize_name(name);
        self.zones.iter().find(|zone| zone.contains(&name))
    }

    pub fn route(&self, name: &str) -> Route {
        match self.matched_zone(name) {
            Some(_) => Route::Intercept,
            None => Route::Forward,
        }
    }
}

pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return ".".to_string();
    }
    let mut name = trimmed.to_ascii_lowercase();
    name.push('.');
    name
}
