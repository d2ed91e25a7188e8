//! Embedded schema for the keygate database.
//!
//! Applied idempotently at startup; every statement is IF NOT EXISTS so a
//! restart against an existing database is a no-op.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id          BLOB PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    domain      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS providers (
    id              BLOB PRIMARY KEY,
    organization_id BLOB NOT NULL REFERENCES organizations(id),
    name            TEXT NOT NULL,
    kind            TEXT NOT NULL,
    url             TEXT NOT NULL DEFAULT '',
    client_id       TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (organization_id, name)
);

CREATE TABLE IF NOT EXISTS identities (
    id              BLOB PRIMARY KEY,
    organization_id BLOB NOT NULL REFERENCES organizations(id),
    name            TEXT NOT NULL,
    last_seen_at    TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (organization_id, name)
);

CREATE TABLE IF NOT EXISTS credentials (
    id                BLOB PRIMARY KEY,
    identity_id       BLOB NOT NULL UNIQUE REFERENCES identities(id) ON DELETE CASCADE,
    password_hash     TEXT NOT NULL,
    one_time_password INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS groups (
    id                  BLOB PRIMARY KEY,
    organization_id     BLOB NOT NULL REFERENCES organizations(id),
    name                TEXT NOT NULL,
    created_by_provider BLOB,
    created_at          TEXT NOT NULL,
    UNIQUE (organization_id, name)
);

CREATE TABLE IF NOT EXISTS identities_groups (
    identity_id BLOB NOT NULL REFERENCES identities(id),
    group_id    BLOB NOT NULL REFERENCES groups(id),
    PRIMARY KEY (identity_id, group_id)
);

CREATE TABLE IF NOT EXISTS provider_users (
    identity_id BLOB NOT NULL REFERENCES identities(id),
    provider_id BLOB NOT NULL REFERENCES providers(id),
    email       TEXT NOT NULL,
    groups      TEXT NOT NULL DEFAULT '',
    last_update TEXT NOT NULL,
    PRIMARY KEY (identity_id, provider_id)
);

CREATE TABLE IF NOT EXISTS access_keys (
    id                 BLOB PRIMARY KEY,
    name               TEXT NOT NULL DEFAULT '',
    issued_for         BLOB NOT NULL REFERENCES identities(id),
    provider_id        BLOB NOT NULL REFERENCES providers(id),
    expires_at         TEXT NOT NULL,
    extension_seconds  INTEGER NOT NULL,
    extension_deadline TEXT NOT NULL,
    scopes             TEXT NOT NULL DEFAULT '',
    key_id             TEXT NOT NULL UNIQUE,
    secret_checksum    TEXT NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grants (
    id              BLOB PRIMARY KEY,
    organization_id BLOB NOT NULL REFERENCES organizations(id),
    subject         BLOB NOT NULL,
    resource        TEXT NOT NULL,
    role            TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (subject, resource, role)
);

CREATE INDEX IF NOT EXISTS idx_access_keys_issued_for ON access_keys(issued_for);
CREATE INDEX IF NOT EXISTS idx_grants_subject ON grants(subject);
CREATE INDEX IF NOT EXISTS idx_identities_name ON identities(organization_id, name);
"#;
