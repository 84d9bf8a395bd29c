// crates/approval-gate-http/src/dto.rs
// ============================================================================
// Module: Wire DTOs
// Description: Request/response JSON shapes for the approval HTTP surface.
// Purpose: Keep the §6 wire contract (camelCase, opaque JSON plan payloads)
// separate from the snake_case core data model.
// Dependencies: serde, serde_json, approval_gate_core
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use approval_gate_core::ApprovalRecord;
use approval_gate_core::ApprovalStatus;
use approval_gate_core::ChainProgress;
use approval_gate_core::ChainStepInstance;
use approval_gate_core::ChainTemplate;
use approval_gate_core::PlanStep;

/// Body of `POST /pj/execute`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Caller-supplied idempotency discriminator; a server id is minted when
    /// absent.
    #[serde(default)]
    pub request_id: Option<String>,
    /// `"execute"` (governed gate), `"launch"` (bypass the gate), or
    /// `"dry-run"` (bypass the gate without mutating external systems).
    pub mode: ExecuteMode,
    /// Domain label classifying the action for the authorization evaluator.
    pub action_intent: String,
    /// The ordered plan steps to gate or run.
    pub plan_steps: Vec<PlanStepInput>,
    /// Opaque audit payload recorded verbatim alongside the approval.
    #[serde(default)]
    pub audit_record: serde_json::Value,
    /// Opaque decision context recorded verbatim alongside the approval.
    #[serde(default)]
    pub decision_result: serde_json::Value,
    /// Schema version this submission was authored against.
    #[serde(default)]
    pub schema_version: u32,
    /// Overrides the default approval TTL, in seconds.
    pub ttl_seconds: Option<i64>,
}

/// The `mode` discriminator of [`ExecuteRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecuteMode {
    /// Route through the approval gate.
    Execute,
    /// Bypass the gate and dispatch immediately.
    Launch,
    /// Bypass the gate; handlers must not mutate external state.
    DryRun,
}

/// One plan step as submitted on the wire.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStepInput {
    /// Caller-assigned step identifier, unique within the plan.
    pub step_id: String,
    /// Human-readable description of the step's effect.
    pub description: String,
    /// Connector name this step is routed to, or `"none"`.
    #[serde(default = "default_connector")]
    pub connector: String,
    /// Opaque connector-specific payload.
    #[serde(default)]
    pub plan: serde_json::Value,
}

fn default_connector() -> String {
    approval_gate_core::approval::NO_CONNECTOR.to_string()
}

/// Body of `POST /approvals/:id/decide`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    /// `"approved"` or `"rejected"`.
    pub status: DecideStatus,
    /// Optional free-text decision note.
    #[serde(default)]
    pub note: Option<String>,
    /// The chain step being decided, when the approval has a chain.
    #[serde(default)]
    pub step_id: Option<String>,
}

/// The `status` discriminator of [`DecideRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecideStatus {
    /// Approve the approval or chain step.
    Approved,
    /// Reject the approval or chain step.
    Rejected,
}

/// Body of `POST /approvals/:id/dispatch`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    /// Suppress external side effects while still exercising the dispatch
    /// path, when `true`.
    #[serde(default)]
    pub dry_run: bool,
}

/// Query parameters of `GET /approvals`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApprovalsQuery {
    /// Filter by approval status.
    pub status: Option<ApprovalStatus>,
    /// Maximum rows returned.
    pub limit: Option<u32>,
    /// Rows to skip before the first returned row.
    pub offset: Option<u32>,
}

/// Body of `POST /chain-templates` and `PUT /chain-templates/:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTemplateRequest {
    /// Template display name.
    pub name: String,
    /// Optional longer-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Ordered (and possibly order-grouped) template steps.
    pub steps: Vec<ChainTemplateStepInput>,
}

/// One template step as submitted on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTemplateStepInput {
    /// Order-group this step belongs to.
    pub order: u32,
    /// Role required to decide this step.
    pub required_role: String,
    /// Human-readable step label.
    pub label: String,
}

/// Wire projection of an [`ApprovalRecord`] for `GET /approvals/:id` and
/// list responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalView {
    /// Server-assigned approval id.
    pub id: String,
    /// Caller-supplied idempotency discriminator.
    pub request_id: String,
    /// Operator who submitted the approval.
    pub operator_id: String,
    /// Workspace the approval belongs to.
    pub workspace_id: String,
    /// Tenant the approval belongs to.
    pub tenant_id: String,
    /// Municipality the approval belongs to.
    pub municipality_id: String,
    /// Domain label classifying the gated action.
    pub action_intent: String,
    /// `"governed"`, `"launch"`, or `"dry-run"`.
    pub action_mode: String,
    /// Canonical-JSON fingerprint of the plan at submission time.
    pub plan_hash: String,
    /// Ordered plan steps and their current dispatch status.
    pub plan_steps: Vec<PlanStep>,
    /// Current lifecycle status.
    pub approval_status: ApprovalStatus,
    /// Operator who decided the approval, once decided.
    pub approver_id: Option<String>,
    /// Free-text decision note, once decided.
    pub approval_note: Option<String>,
    /// Timestamp the approval was dispatched, once dispatched.
    pub dispatched_at: Option<String>,
    /// Per-step dispatch outcome, once dispatched.
    pub dispatch_result: Option<serde_json::Value>,
    /// Submission time.
    pub created_at: String,
    /// Expiry deadline for an undecided approval.
    pub expires_at: String,
}

impl From<ApprovalRecord> for ApprovalView {
    fn from(record: ApprovalRecord) -> Self {
        Self {
            id: record.id.into_string(),
            request_id: record.request_id.into_string(),
            operator_id: record.operator_id.into_string(),
            workspace_id: record.workspace_id.into_string(),
            tenant_id: record.tenant_id.into_string(),
            municipality_id: record.municipality_id.into_string(),
            action_intent: record.action_intent.to_string(),
            action_mode: action_mode_str(record.action_mode),
            plan_hash: record.plan_hash,
            plan_steps: record.plan_steps,
            approval_status: record.approval_status,
            approver_id: record.approver_id.map(approval_gate_core::OperatorId::into_string),
            approval_note: record.approval_note,
            dispatched_at: record.dispatched_at.map(|ts| ts.to_rfc3339()),
            dispatch_result: record.dispatch_result,
            created_at: record.created_at.to_rfc3339(),
            expires_at: record.expires_at.to_rfc3339(),
        }
    }
}

fn action_mode_str(mode: approval_gate_core::ActionMode) -> String {
    serde_json::to_value(mode)
        .ok()
        .and_then(|value| value.as_str().map(ToString::to_string))
        .unwrap_or_default()
}

/// Wire projection of a [`ChainProgress`] for `GET /approvals/:id/chain`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProgressView {
    /// Total steps in the instantiated chain.
    pub total_steps: usize,
    /// Steps that have reached a terminal status.
    pub completed_steps: usize,
    /// Order-group currently active, if any.
    pub current_step: Option<u32>,
    /// Steps active at `current_step`.
    pub current_steps: Vec<ChainStepInstance>,
    /// All steps of this chain in order.
    pub steps: Vec<ChainStepInstance>,
    /// Whether the chain reached `all_approved`.
    pub all_approved: bool,
    /// Whether the chain reached `rejected`.
    pub rejected: bool,
    /// The instantiating template's id.
    pub template_id: String,
    /// The instantiating template's name.
    pub template_name: String,
}

impl ChainProgressView {
    /// Builds a view from a progress summary and the full ordered step list.
    #[must_use]
    pub fn new(progress: ChainProgress, template_id: String, steps: Vec<ChainStepInstance>) -> Self {
        Self {
            total_steps: progress.total,
            completed_steps: progress.completed,
            current_step: progress.current_step,
            current_steps: progress.current_steps,
            steps,
            all_approved: progress.all_approved,
            rejected: progress.rejected,
            template_id,
            template_name: progress.template_name,
        }
    }
}

/// Wire projection of a [`ChainTemplate`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTemplateView {
    /// Template id.
    pub id: String,
    /// Template display name.
    pub name: String,
    /// Optional longer-form description.
    pub description: Option<String>,
    /// Ordered (and possibly order-grouped) template steps.
    pub steps: Vec<approval_gate_core::ChainTemplateStep>,
}

impl From<ChainTemplate> for ChainTemplateView {
    fn from(template: ChainTemplate) -> Self {
        Self {
            id: template.id.into_string(),
            name: template.name,
            description: template.description,
            steps: template.steps,
        }
    }
}
