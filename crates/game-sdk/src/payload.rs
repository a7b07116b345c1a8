//! entry function call descriptions
//!
//! building a call is pure: no i/o, no hidden state, and argument order is
//! preserved exactly as given. parsing type arguments and encoding the
//! arguments happens later, when the call is turned into a wire payload.

use crate::{
    error::{Result, SdkError},
    types::{AccountAddress, EntryFunction, ModuleId, MoveValue, TypeTag},
};

pub const CORE_MODULE: &str = "core";
pub const CREATE_GAME_FUNCTION: &str = "create_game";

/// a call to one on-chain entry function
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallDescription {
    pub target_module: ModuleId,
    pub function_name: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<MoveValue>,
}

impl CallDescription {
    /// `address::module::function`
    pub fn function_id(&self) -> String {
        format!("{}::{}", self.target_module, self.function_name)
    }

    /// parse type arguments and bcs-encode arguments
    pub fn to_entry_function(&self) -> Result<EntryFunction> {
        if !crate::types::is_identifier(&self.function_name) {
            return Err(SdkError::Validation(format!(
                "invalid function name {:?}",
                self.function_name
            )));
        }

        let ty_args = self
            .type_arguments
            .iter()
            .map(|t| t.parse::<TypeTag>())
            .collect::<Result<Vec<_>>>()?;
        let args = self
            .arguments
            .iter()
            .map(MoveValue::to_bcs)
            .collect::<Result<Vec<_>>>()?;

        Ok(EntryFunction {
            module: self.target_module.clone(),
            function: self.function_name.clone(),
            ty_args,
            args,
        })
    }
}

/// builds call descriptions
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn build(
        target_module: ModuleId,
        function_name: impl Into<String>,
        type_arguments: Vec<String>,
        arguments: Vec<MoveValue>,
    ) -> CallDescription {
        CallDescription {
            target_module,
            function_name: function_name.into(),
            type_arguments,
            arguments,
        }
    }
}

/// `<contract>::core::create_game<coin_type>(name, amount, fractions, join_duration)`
pub fn create_game_payload(
    contract_address: AccountAddress,
    coin_type: &str,
    game_name: &str,
    amount_per_depositor: u64,
    withdrawal_fractions: &[u64],
    join_duration_secs: u64,
) -> CallDescription {
    PayloadBuilder::build(
        ModuleId::new(contract_address, CORE_MODULE),
        CREATE_GAME_FUNCTION,
        vec![coin_type.to_string()],
        vec![
            MoveValue::from(game_name),
            MoveValue::U64(amount_per_depositor),
            MoveValue::from(withdrawal_fractions.to_vec()),
            MoveValue::U64(join_duration_secs),
        ],
    )
}
