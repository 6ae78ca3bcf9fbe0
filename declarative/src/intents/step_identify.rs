//! The identify step: establish who the flow is about.

use async_trait::async_trait;
use authflow_core::config::{FlowPointer, FlowStepConfig, FlowType, Identification};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::identity::{IdentityInfo, IdentityType, LoginIdType};
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::milestone;
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use serde::{Deserialize, Serialize};

use crate::inputs::{IdentifySchema, InputIdentify};
use crate::nodes::{NodeDoCreateIdentity, NodeDoUseIdentity};
use crate::output::IdentificationData;
use crate::policy::determined_user;

use super::IntentFlowSteps;

/// Owns one configured identify step. Login and reauth flows select an
/// existing identity; signup flows establish a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentFlowStepIdentify {
    /// Which flow definition this step belongs to.
    pub flow_type: FlowType,
    /// The step's location in the definition.
    pub pointer: FlowPointer,
}

impl IntentFlowStepIdentify {
    fn options(&self, deps: &Dependencies) -> Result<Vec<Identification>> {
        match self.pointer.resolve(deps.config.flow(self.flow_type))? {
            FlowStepConfig::Identify { one_of } => {
                Ok(one_of.iter().map(|branch| branch.identification).collect())
            }
            _ => Err(FlowError::MalformedState {
                reason: format!("pointer {} is not an identify step", self.pointer),
            }),
        }
    }

    /// The branch index matching the identity the step established.
    fn taken_branch(&self, deps: &Dependencies, flows: FlowView<'_>) -> Result<usize> {
        let identity = milestone::selected_identity(flows.nearest)
            .ok_or_else(|| FlowError::Internal("identify step has no selected identity".into()))?;
        let identification = identification_of(&identity);
        self.options(deps)?
            .iter()
            .position(|&option| option == identification)
            .ok_or_else(|| FlowError::Internal("selected identity matches no branch".into()))
    }

    fn branch_steps_len(&self, deps: &Dependencies, branch: usize) -> Result<usize> {
        let config = deps.config.flow(self.flow_type);
        Ok(self.pointer.resolve_branch_steps(config, branch)?.len())
    }

    async fn identify(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        input: &InputIdentify,
    ) -> Result<ReactResult> {
        let options = self.options(deps)?;
        let identification = match input.identification {
            Some(explicit) => explicit,
            None => {
                let login_id =
                    input.login_id.as_deref().ok_or(FlowError::IncompatibleInput)?;
                crate::policy::classify_login_id(&options, login_id)
                    .ok_or(FlowError::IncompatibleInput)?
            }
        };
        if !options.contains(&identification) {
            return Err(FlowError::IncompatibleInput);
        }

        if identification == Identification::Anonymous {
            return self.identify_anonymous(deps, flows);
        }

        let login_id_type = match identification {
            Identification::Email => LoginIdType::Email,
            Identification::Phone => LoginIdType::Phone,
            Identification::Username => LoginIdType::Username,
            Identification::Anonymous => return Err(FlowError::IncompatibleInput),
        };
        let login_id = input.login_id.as_deref().ok_or(FlowError::IncompatibleInput)?;
        let existing = deps.identities.get_by_login_id(login_id_type, login_id).await?;

        match self.flow_type {
            FlowType::Login | FlowType::Reauth => {
                let identity = existing.ok_or(FlowError::UserNotFound)?;
                Ok(ReactResult::Node(Box::new(NodeDoUseIdentity { identity })))
            }
            FlowType::Signup => {
                if existing.is_some() {
                    return Err(FlowError::DuplicatedIdentity);
                }
                let user_id = determined_user(flows.root)?;
                let identity = IdentityInfo::new_login_id(user_id, login_id_type, login_id);
                Ok(ReactResult::Node(Box::new(NodeDoCreateIdentity { identity })))
            }
        }
    }

    fn identify_anonymous(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
    ) -> Result<ReactResult> {
        if !deps.config.anonymous_users_enabled {
            return Err(FlowError::ConfigurationViolated {
                reason: "anonymous users are disabled".into(),
            });
        }
        // Anonymous users authenticate with a keypair outside interactive
        // flows; only signup can establish one here.
        if self.flow_type != FlowType::Signup {
            return Err(FlowError::ConfigurationViolated {
                reason: format!(
                    "anonymous identification is not allowed in a {} flow",
                    self.flow_type.as_str()
                ),
            });
        }
        let user_id = determined_user(flows.root)?;
        let identity = IdentityInfo::new_anonymous(user_id);
        Ok(ReactResult::Node(Box::new(NodeDoCreateIdentity { identity })))
    }
}

fn identification_of(identity: &IdentityInfo) -> Identification {
    if identity.r#type == IdentityType::Anonymous {
        return Identification::Anonymous;
    }
    match identity.login_id_type() {
        Some(LoginIdType::Email) => Identification::Email,
        Some(LoginIdType::Phone) => Identification::Phone,
        Some(LoginIdType::Username) | None => Identification::Username,
    }
}

impl Kinded for IntentFlowStepIdentify {
    const KIND: &'static str = "IntentFlowStepIdentify";
}

#[async_trait]
impl Intent for IntentFlowStepIdentify {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn data(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    async fn can_react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>> {
        match flows.nearest.nodes.len() {
            0 => Ok(Some(Box::new(IdentifySchema::new(self.pointer.clone())))),
            1 => {
                let branch = self.taken_branch(deps, flows)?;
                if self.branch_steps_len(deps, branch)? > 0 {
                    Ok(None)
                } else {
                    Err(FlowError::Eof)
                }
            }
            _ => Err(FlowError::Eof),
        }
    }

    async fn react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        input: &FlowInput,
    ) -> Result<ReactResult> {
        match flows.nearest.nodes.len() {
            0 => {
                let input: InputIdentify = input.get().ok_or(FlowError::IncompatibleInput)?;
                self.identify(deps, flows, &input).await
            }
            1 => {
                let branch = self.taken_branch(deps, flows)?;
                Ok(ReactResult::SubFlow(Box::new(IntentFlowSteps {
                    flow_type: self.flow_type,
                    pointer: self.pointer.one_of(branch),
                })))
            }
            _ => Err(FlowError::IncompatibleInput),
        }
    }

    async fn output_data(
        &self,
        deps: &Dependencies,
        _flows: FlowView<'_>,
    ) -> Result<Option<serde_json::Value>> {
        let data = IdentificationData { options: self.options(deps)? };
        Ok(Some(serde_json::to_value(data)?))
    }
}
