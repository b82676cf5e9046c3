/// Keys used in the meta database
pub mod meta_keys {
    pub const SCHEMA_VERSION: &str = "schema_version";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Named LMDB databases inside the environment
pub mod db_names {
    pub const STATE: &str = "state";
    pub const META: &str = "meta";
}
