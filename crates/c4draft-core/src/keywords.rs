//! Fixed keyword tables used by the readiness validator.
//!
//! All tables are lower-case and matched against lower-cased input. The
//! indicator tables use substring matching ("customers" hits "customer"),
//! the common-word dictionary uses whole-word matching.

/// Words whose presence means a system is being described.
pub const SYSTEM_INDICATORS: &[&str] = &[
    "build", "create", "develop", "make", "design",
    "system", "application", "app", "service", "platform", "tool",
    "web", "mobile", "api", "backend", "frontend", "dashboard",
    "website", "portal", "interface",
];

/// Words naming people or roles that use the system.
pub const USER_INDICATORS: &[&str] = &[
    "user", "users", "customer", "customers", "admin", "administrator",
    "client", "clients", "people", "person", "employee", "staff",
    "developer", "manager", "operator", "visitor", "member",
];

/// Words hinting at systems outside the one being built.
pub const EXTERNAL_INDICATORS: &[&str] = &[
    "api", "database", "server", "service", "integration",
    "whatsapp", "google", "aws", "azure", "stripe", "paypal",
    "email", "sms", "storage", "s3", "sftp", "ftp",
];

/// Verbs describing interactions between elements.
pub const RELATIONSHIP_INDICATORS: &[&str] = &[
    "connect", "communicate", "interact", "send", "receive",
    "call", "request", "response", "publish", "subscribe",
    "read", "write", "query", "update", "integrate", "access", "manage", "share",
];

/// Dictionary of common words expected in a real description.
pub const COMMON_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with",
    "build", "create", "make", "develop", "system", "app", "application", "web", "mobile",
    "data", "user", "users", "from", "that", "this", "is", "are", "will", "can", "need",
    "want", "have", "has", "use", "using", "connect", "integrate", "send", "receive",
    "service", "api", "database", "server", "client", "platform", "interface",
];

/// True when any keyword occurs as a substring of `text_lower`.
pub fn mentions_any(text_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text_lower.contains(k))
}
