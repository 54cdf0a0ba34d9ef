//! Resource classification: which paths are premium and what they cost

use super::requirement::Price;

/// Price and description for a premium route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumOffer {
    pub price: Price,
    pub description: String,
}

/// Classification of a requested resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceClass {
    Free,
    Premium(PremiumOffer),
}

impl ResourceClass {
    pub fn is_premium(&self) -> bool {
        matches!(self, ResourceClass::Premium(_))
    }
}

#[derive(Debug, Clone)]
struct PremiumRoute {
    path_prefix: String,
    offer: PremiumOffer,
}

/// Prefix table of premium routes; unmatched paths are free
#[derive(Debug, Clone, Default)]
pub struct PaymentRoutes {
    routes: Vec<PremiumRoute>,
}

impl PaymentRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a premium prefix. Longer prefixes win over shorter ones.
    pub fn premium(mut self, path_prefix: &str, price: Price, description: &str) -> Self {
        self.routes.push(PremiumRoute {
            path_prefix: path_prefix.to_string(),
            offer: PremiumOffer {
                price,
                description: description.to_string(),
            },
        });
        self.routes
            .sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        self
    }

    pub fn classify(&self, path: &str) -> ResourceClass {
        self.routes
            .iter()
            .find(|route| path.starts_with(&route.path_prefix))
            .map(|route| ResourceClass::Premium(route.offer.clone()))
            .unwrap_or(ResourceClass::Free)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
