use crate::prelude::{Samples, Shape, ShapeContract, StageResult, Transform};

/// Pass-through stage, handy for debugging a chain.
#[derive(Debug, Clone)]
pub struct Identity {
    contract: ShapeContract,
}

impl Identity {
    pub fn new(in_shape: Shape) -> Self {
        Self {
            contract: ShapeContract::preserving(in_shape),
        }
    }
}

impl Transform for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn contract(&self) -> &ShapeContract {
        &self.contract
    }

    fn transform(&self, input: &Samples) -> StageResult<Samples> {
        Ok(input.clone())
    }
}
