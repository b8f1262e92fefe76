//! Escalation routing to organizational units.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use super::types::{Classification, ComplaintId};
use crate::error::{ConfigError, RoutingError, TemplateError};
use crate::mail::{DeliveryReceipt, Mailer};
use crate::templates::{escape_html, format_placeholders, load_template};

/// Classification IDs the classifier prompt may emit, with their unit names.
pub const CLASSIFICATION_UNITS: [(u32, &str); 3] = [(1, "RSA"), (2, "NDB"), (3, "CS")];

/// Destination mailbox for one organizational unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub unit_name: String,
    pub address: String,
}

/// Read-only mapping from classification ID to destination.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    targets: BTreeMap<u32, RoutingTarget>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(
        mut self,
        classification_id: u32,
        unit_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.targets.insert(
            classification_id,
            RoutingTarget {
                unit_name: unit_name.into(),
                address: address.into(),
            },
        );
        self
    }

    pub fn lookup(&self, classification_id: u32) -> Option<&RoutingTarget> {
        self.targets.get(&classification_id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Check that every ID the classifier may emit has a destination.
    pub fn validate(&self, allowed: &[(u32, &str)]) -> Result<(), ConfigError> {
        for (id, unit) in allowed {
            match self.targets.get(id) {
                Some(target) if !target.address.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::UnroutedClassification {
                        id: *id,
                        unit: unit.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Forwards classified complaints to their unit.
pub struct Router {
    table: Arc<RoutingTable>,
    mailer: Arc<dyn Mailer>,
    template: String,
}

impl Router {
    /// `template` is the escalation HTML with `{unit_name}`, `{complaint_id}`,
    /// `{primary_issue}`, `{priority}` and `{body}` placeholders.
    pub fn new(table: Arc<RoutingTable>, mailer: Arc<dyn Mailer>, template: impl Into<String>) -> Self {
        Self {
            table,
            mailer,
            template: template.into(),
        }
    }

    /// Build a router whose escalation template is read from `path`.
    pub fn from_template_file(
        table: Arc<RoutingTable>,
        mailer: Arc<dyn Mailer>,
        path: impl AsRef<Path>,
    ) -> Result<Self, TemplateError> {
        Ok(Self::new(table, mailer, load_template(path)?))
    }

    /// Render the escalation email for a classification.
    pub fn render(
        &self,
        classification: &Classification,
        complaint_id: &ComplaintId,
        complaint_body: &str,
    ) -> Result<String, TemplateError> {
        let unit_name = escape_html(&classification.classification_name);
        let priority = escape_html(&classification.suggested_priority.to_string());
        let primary_issue = escape_html(&classification.primary_issue);
        let body = escape_html(complaint_body);
        format_placeholders(
            &self.template,
            &[
                ("unit_name", &unit_name),
                ("complaint_id", complaint_id.as_str()),
                ("primary_issue", &primary_issue),
                ("priority", &priority),
                ("body", &body),
            ],
        )
    }

    /// Send the complaint to the unit its classification maps to.
    pub async fn route(
        &self,
        classification: &Classification,
        complaint_id: &ComplaintId,
        complaint_body: &str,
    ) -> Result<DeliveryReceipt, RoutingError> {
        let id = classification.classification_id;
        info!(
            complaint_id = %complaint_id,
            classification_id = id,
            classification = %classification.classification_name,
            "Handling issue"
        );

        let Some(target) = self.table.lookup(id) else {
            error!(
                complaint_id = %complaint_id,
                classification_id = id,
                "Classification has no configured destination, not routing"
            );
            return Err(RoutingError::UnknownClassification { id });
        };

        let html = self.render(classification, complaint_id, complaint_body)?;
        let subject = assignment_subject(&classification.classification_name);

        info!(
            complaint_id = %complaint_id,
            unit = %target.unit_name,
            recipient = %target.address,
            "Routing complaint"
        );
        let receipt = self
            .mailer
            .send_email(&target.address, &subject, &html)
            .await
            .inspect_err(|e| {
                error!(
                    complaint_id = %complaint_id,
                    recipient = %target.address,
                    error = %e,
                    "Failed to send routing email"
                )
            })?;
        Ok(receipt)
    }
}

/// Subject line for a routing email.
pub fn assignment_subject(unit_name: &str) -> String {
    format!("Issue Assigned to: {unit_name}")
}
