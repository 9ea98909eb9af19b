use redb::TableDefinition;

/// Client-side key/value entries: key -> MessagePack value
pub const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// Key the persisted session lives under
pub const SESSION_KEY: &str = "auth-storage";

/// Key the persisted `Set-Cookie` headers live under
pub const COOKIES_KEY: &str = "auth-cookies";
