//! Cedar-based authorization engine for Steward.
//!
//! This crate decides whether an actor may perform a capability verb on a
//! securable resource, using the [Cedar policy language](https://www.cedarpolicy.com/).
//!
//! # Architecture Overview
//!
//! 1. The caller loads the actor's role assignments on the resource and on
//!    every ancestor scope, as [`types::Grant`]s.
//! 2. Each grant is compiled into one `permit` policy:
//!    `permit(principal == Actor::"<id>", action in [...], resource in Actee::"<scope>")`.
//! 3. The resource lineage becomes the Cedar entity hierarchy, so `resource in`
//!    matches the resource itself and all of its descendants.
//! 4. The [`Evaluator`] answers one or many verb checks against that snapshot.
//!
//! Anything without an explicit permit is denied.
//!
//! The escalation guard ([`Evaluator::can_assign_role`]) is evaluated on the
//! same snapshot: a role may be granted only when every one of its verbs is
//! permitted to the granting actor on the target resource.

pub mod error;
pub mod types;

use cedar_policy::{
    Authorizer, Context, Decision, Entities, EntityId, EntityTypeName, EntityUid, PolicySet,
    Request,
};
use error::{AuthzError, Result};
use std::str::FromStr;
use types::{Action, Grant, Principal, Resource};

const ACTEE_TYPE: &str = "Actee";
const ACTION_TYPE: &str = "Action";

/// The core authorization engine for evaluating Cedar policies.
pub struct AuthzEngine {
    authorizer: Authorizer,
}

impl AuthzEngine {
    pub fn new() -> Self {
        Self {
            authorizer: Authorizer::new(),
        }
    }

    /// Compiles the principal's grants and the resource hierarchy into an
    /// evaluator that can answer several verb checks without recompiling.
    pub fn evaluator(
        &self,
        principal: &Principal,
        grants: &[Grant],
        resource: &Resource,
    ) -> Result<Evaluator<'_>> {
        let policies = self.compile_policies(principal, grants)?;
        let entities = self.build_entities(resource)?;

        Ok(Evaluator {
            authorizer: &self.authorizer,
            principal: entity_uid(&principal.entity_type, &principal.id)?,
            resource: entity_uid(ACTEE_TYPE, &resource.id)?,
            policies,
            entities,
        })
    }

    /// Single verb check.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if some grant explicitly permits the action
    /// - `Ok(false)` otherwise
    /// - `Err(AuthzError)` if the policies or request could not be built
    pub fn is_authorized(
        &self,
        principal: &Principal,
        grants: &[Grant],
        action: &Action,
        resource: &Resource,
    ) -> Result<bool> {
        self.evaluator(principal, grants, resource)?.permits(action)
    }

    /// Builds one permit policy per grant. Grants without verbs confer nothing.
    fn compile_policies(&self, principal: &Principal, grants: &[Grant]) -> Result<PolicySet> {
        let principal_ref = format!(
            "{}::\"{}\"",
            principal.entity_type,
            escape(&principal.id)
        );

        let mut policy_src = String::new();
        for grant in grants.iter().filter(|g| !g.verbs.is_empty()) {
            let actions = grant
                .verbs
                .iter()
                .map(|verb| format!("{}::\"{}\"", ACTION_TYPE, escape(verb)))
                .collect::<Vec<_>>()
                .join(", ");

            policy_src.push_str(&format!(
                "permit(principal == {}, action in [{}], resource in {}::\"{}\");\n",
                principal_ref,
                actions,
                ACTEE_TYPE,
                escape(&grant.actee_id)
            ));
        }

        if policy_src.is_empty() {
            return Ok(PolicySet::new());
        }

        PolicySet::from_str(&policy_src).map_err(|e| AuthzError::PolicyParse(e.to_string()))
    }

    /// Turns the resource lineage into Cedar entities with parent links.
    fn build_entities(&self, resource: &Resource) -> Result<Entities> {
        let mut seen = std::collections::HashSet::new();
        let entities_json: Vec<serde_json::Value> = resource
            .lineage
            .iter()
            .filter(|edge| seen.insert(edge.id.clone()))
            .map(|edge| {
                let parents: Vec<serde_json::Value> = edge
                    .parents
                    .iter()
                    .map(|parent| serde_json::json!({ "type": ACTEE_TYPE, "id": parent }))
                    .collect();

                serde_json::json!({
                    "uid": { "type": ACTEE_TYPE, "id": edge.id },
                    "attrs": {},
                    "parents": parents
                })
            })
            .collect();

        Entities::from_json_value(serde_json::Value::Array(entities_json), None)
            .map_err(|e| AuthzError::EntityCreation(e.to_string()))
    }
}

impl Default for AuthzEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled snapshot of one principal's grants over one resource.
pub struct Evaluator<'a> {
    authorizer: &'a Authorizer,
    principal: EntityUid,
    resource: EntityUid,
    policies: PolicySet,
    entities: Entities,
}

impl Evaluator<'_> {
    pub fn permits(&self, action: &Action) -> Result<bool> {
        let request = Request::new(
            Some(self.principal.clone()),
            Some(entity_uid(ACTION_TYPE, &action.name)?),
            Some(self.resource.clone()),
            Context::empty(),
            None,
        )
        .map_err(|e| AuthzError::EvaluationError(e.to_string()))?;

        let response = self
            .authorizer
            .is_authorized(&request, &self.policies, &self.entities);

        Ok(response.decision() == Decision::Allow)
    }

    /// Escalation guard for grants.
    ///
    /// A role may be assigned here only if every verb it carries is already
    /// permitted to the principal. Vacuously true for a role without verbs.
    pub fn can_assign_role(&self, role_verbs: &[String]) -> Result<bool> {
        for verb in role_verbs {
            if !self.permits(&Action::new(verb.as_str()))? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn entity_uid(entity_type: &str, id: &str) -> Result<EntityUid> {
    let type_name = EntityTypeName::from_str(entity_type)
        .map_err(|e| AuthzError::EntityCreation(format!("Invalid entity type: {}", e)))?;
    Ok(EntityUid::from_type_name_and_id(type_name, EntityId::new(id)))
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
