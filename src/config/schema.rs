use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "providers": {
                "type": "object",
                "properties": {
                    "certificate": { "$ref": "#/$defs/provider" },
                    "host": { "$ref": "#/$defs/provider" }
                }
            },
            "breach": {
                "type": "object",
                "properties": {
                    "mode": { "type": "string", "enum": ["remote", "local"] },
                    "api_key": { "type": "string" },
                    "dataset_path": { "type": "string" }
                }
            },
            "scan": {
                "type": "object",
                "properties": {
                    "port_timeout_secs": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "tls_timeout_secs": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "http_timeout_secs": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "dns_timeout_secs": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "provider_timeout_secs": { "type": "integer", "minimum": 1, "maximum": 15 },
                    "subdomain_wordlist_limit": { "type": "integer", "minimum": 0 },
                    "subdomain_resolution_limit": { "type": "integer", "minimum": 1 },
                    "directory_wordlist_limit": { "type": "integer", "minimum": 0 },
                    "directory_batch_size": { "type": "integer", "minimum": 1 }
                }
            },
            "worker": {
                "type": "object",
                "properties": {
                    "concurrency": { "type": "integer", "minimum": 1 },
                    "poll_interval_ms": { "type": "integer", "minimum": 10 },
                    "max_attempts": { "type": "integer", "minimum": 1 }
                }
            },
            "cache": {
                "type": "object",
                "properties": {
                    "enabled": { "type": "boolean" },
                    "ttl_secs": { "type": "integer", "minimum": 0 }
                }
            },
            "retry": {
                "type": "object",
                "properties": {
                    "max_retries": { "type": "integer", "minimum": 0, "maximum": 5 },
                    "base_delay_ms": { "type": "integer", "minimum": 0 }
                }
            },
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            },
            "notifications": {
                "type": "object",
                "properties": {
                    "webhook_url": { "type": "string", "format": "uri" }
                }
            }
        },
        "$defs": {
            "provider": {
                "type": "object",
                "properties": {
                    "api_key": { "type": "string" },
                    "base_url": { "type": "string" }
                }
            }
        }
    })
});
