use super::DbTableName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerKind {
    /// Maintains the owning document's update stamp
    DocumentStamping,

    /// Maintains the referential identity row of a concrete resource
    ReferentialIdentityMaintenance,

    /// Propagates a subclass's identity into its abstract identity table
    AbstractIdentityMaintenance { target_table: DbTableName },
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::DocumentStamping => "DocumentStamping",
            TriggerKind::ReferentialIdentityMaintenance => "ReferentialIdentityMaintenance",
            TriggerKind::AbstractIdentityMaintenance { .. } => "AbstractIdentityMaintenance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTriggerInfo {
    pub name: String,
    pub table: DbTableName,
    pub kind: TriggerKind,
    pub key_columns: Vec<String>,
    pub identity_projection_columns: Vec<String>,
}
