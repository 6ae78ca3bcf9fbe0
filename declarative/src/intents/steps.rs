//! Executes one configured steps list, opening a step intent per entry.

use async_trait::async_trait;
use authflow_core::config::{FlowPointer, FlowStepConfig, FlowType};
use authflow_core::deps::Dependencies;
use authflow_core::error::{FlowError, Result};
use authflow_core::input::{FlowInput, InputSchema};
use authflow_core::reactor::{FlowView, Intent, Kinded, ReactResult};
use serde::{Deserialize, Serialize};

use crate::policy::steps_at;

use super::{
    IntentFlowStepAuthenticate, IntentFlowStepCreateAuthenticator, IntentFlowStepIdentify,
    IntentFlowStepVerify,
};

/// Runs the steps list addressed by `pointer` — the flow's top-level
/// steps, or the nested steps of a taken branch. One sub-flow is opened
/// per step, strictly in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentFlowSteps {
    /// Which flow definition the steps come from.
    pub flow_type: FlowType,
    /// Pointer to the steps list's owner.
    pub pointer: FlowPointer,
}

impl Kinded for IntentFlowSteps {
    const KIND: &'static str = "IntentFlowSteps";
}

#[async_trait]
impl Intent for IntentFlowSteps {
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
        let steps = steps_at(deps.config.flow(self.flow_type), &self.pointer)?;
        if flows.nearest.nodes.len() < steps.len() {
            Ok(None)
        } else {
            Err(FlowError::Eof)
        }
    }

    async fn react_to(
        &self,
        deps: &Dependencies,
        flows: FlowView<'_>,
        _input: &FlowInput,
    ) -> Result<ReactResult> {
        let config = deps.config.flow(self.flow_type);
        let index = flows.nearest.nodes.len();
        let step = steps_at(config, &self.pointer)?
            .get(index)
            .ok_or_else(|| FlowError::Internal("steps list exhausted".into()))?;
        let pointer = self.pointer.step(index);

        let intent: Box<dyn Intent> = match step {
            FlowStepConfig::Identify { .. } => {
                Box::new(IntentFlowStepIdentify { flow_type: self.flow_type, pointer })
            }
            FlowStepConfig::Authenticate { .. } => Box::new(
                IntentFlowStepAuthenticate::new(deps, flows.root, self.flow_type, pointer).await?,
            ),
            FlowStepConfig::Verify => Box::new(IntentFlowStepVerify { pointer }),
            FlowStepConfig::CreateAuthenticator { .. } => {
                Box::new(IntentFlowStepCreateAuthenticator { flow_type: self.flow_type, pointer })
            }
        };
        Ok(ReactResult::SubFlow(intent))
    }
}
