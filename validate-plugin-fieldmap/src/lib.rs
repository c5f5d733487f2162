//! `fieldmap` plugin family: checks a cross-project field-mapping config against a
//! field-catalog snapshot, and prunes or records what it finds.

pub mod model;
pub mod problems;
mod providers;
mod remediators;
mod validators;

pub use providers::{MappingConfigProvider, MappingPairProvider};
pub use remediators::{AuditTrailRemediator, ConfigPruneRemediator};
pub use validators::{
    DuplicateMappingValidator, FieldExistenceValidator, RequiredFieldCoverageValidator,
    SchemaCompatibilityValidator,
};

use validate_domain::{ArgSpec, CapabilityDescriptor, PluginEntry};

pub const DOMAIN: &str = "fieldmap";

pub const CONFIG_CONTEXT: &str = "fieldmap.config";
pub const PAIR_CONTEXT: &str = "fieldmap.pair";

pub const DUPLICATE_MAPPING: &str = "fieldmap.duplicate_mapping";
pub const FIELD_MISSING_FROM_SOURCE: &str = "fieldmap.field_missing_from_source";
pub const FIELD_MISSING_FROM_TARGET: &str = "fieldmap.field_missing_from_target";
pub const SCHEMA_MISMATCH: &str = "fieldmap.schema_mismatch";
pub const REQUIRED_FIELD_UNMAPPED: &str = "fieldmap.required_field_unmapped";

pub const ARG_MAPPING_CONFIG: &str = "mapping-config";
pub const ARG_FIELD_CATALOG: &str = "field-catalog";
pub const ARG_SOURCE_PROJECT: &str = "source-project";
pub const ARG_TARGET_PROJECT: &str = "target-project";
pub const ARG_AUDIT_LOG: &str = "audit-log";

fn mapping_config_arg() -> ArgSpec {
    ArgSpec::required(ARG_MAPPING_CONFIG, "Path to the field-mapping config (JSON)")
}

/// Every plugin in the family, in registration order.
pub fn builtin_plugins() -> Vec<PluginEntry> {
    vec![
        PluginEntry::provider(
            CapabilityDescriptor::provider("mapping-config-provider", DOMAIN, CONFIG_CONTEXT)
                .describe("Parses the mapping config")
                .arg(mapping_config_arg()),
            || MappingConfigProvider,
        ),
        PluginEntry::provider(
            CapabilityDescriptor::provider("mapping-pair-provider", DOMAIN, PAIR_CONTEXT)
                .describe("Joins each mapping with source and target fields from the catalog")
                .arg(mapping_config_arg())
                .arg(ArgSpec::required(
                    ARG_FIELD_CATALOG,
                    "Path to the field-catalog snapshot (JSON)",
                ))
                .arg(ArgSpec::optional(
                    ARG_SOURCE_PROJECT,
                    "Only check mappings from this project",
                ))
                .arg(ArgSpec::optional(
                    ARG_TARGET_PROJECT,
                    "Only check mappings into this project",
                )),
            || MappingPairProvider,
        ),
        PluginEntry::validator(
            CapabilityDescriptor::validator("duplicate-mapping", DOMAIN)
                .describe("Flags mappings declared more than once")
                .requires(CONFIG_CONTEXT)
                .produces(DUPLICATE_MAPPING)
                .tag("fieldmap")
                .tag("config"),
            || DuplicateMappingValidator,
        ),
        PluginEntry::validator(
            CapabilityDescriptor::validator("field-existence", DOMAIN)
                .describe("Checks configured fields exist on the side they are used")
                .requires(PAIR_CONTEXT)
                .produces(FIELD_MISSING_FROM_SOURCE)
                .produces(FIELD_MISSING_FROM_TARGET)
                .tag("fieldmap")
                .tag("fields"),
            || FieldExistenceValidator,
        ),
        PluginEntry::validator(
            CapabilityDescriptor::validator("schema-compatibility", DOMAIN)
                .describe("Checks mirrored fields have compatible types")
                .requires(PAIR_CONTEXT)
                .produces(SCHEMA_MISMATCH)
                .tag("fieldmap")
                .tag("schema"),
            || SchemaCompatibilityValidator,
        ),
        PluginEntry::validator(
            CapabilityDescriptor::validator("required-field-coverage", DOMAIN)
                .describe("Checks every required target field gets a value on create")
                .requires(PAIR_CONTEXT)
                .produces(REQUIRED_FIELD_UNMAPPED)
                .tag("fieldmap")
                .tag("create"),
            || RequiredFieldCoverageValidator,
        ),
        PluginEntry::remediator(
            CapabilityDescriptor::remediator("config-prune", DOMAIN)
                .describe("Removes duplicate mappings and missing fields from the config")
                .handles(DUPLICATE_MAPPING)
                .handles(FIELD_MISSING_FROM_SOURCE)
                .handles(FIELD_MISSING_FROM_TARGET)
                .priority(20)
                .arg(ArgSpec::optional(
                    ARG_MAPPING_CONFIG,
                    "Path to the field-mapping config (JSON)",
                )),
            ConfigPruneRemediator::from_args,
        ),
        PluginEntry::remediator(
            CapabilityDescriptor::remediator("audit-trail", DOMAIN)
                .describe("Records unresolved problems in a JSON-lines log")
                .handles(DUPLICATE_MAPPING)
                .handles(FIELD_MISSING_FROM_SOURCE)
                .handles(FIELD_MISSING_FROM_TARGET)
                .handles(SCHEMA_MISMATCH)
                .handles(REQUIRED_FIELD_UNMAPPED)
                .priority(90)
                .arg(ArgSpec::optional(
                    ARG_AUDIT_LOG,
                    "Append unresolved problems to this JSON-lines file",
                )),
            |args| Ok(AuditTrailRemediator::from_args(args)),
        ),
    ]
}
