//! The Establish-User machine.
//!
//! Looks the user up, and if nobody is found lets them either sign in or
//! register. Failed attempts loop back to the same state; the caller stops
//! retrying when it wants to.

use crate::builder::{BuildError, DefinitionBuilder, StateBuilder, TransitionBuilder};
use crate::core::{ContextPatch, MachineDefinition, OutputBuilder};
use crate::effects::EffectTable;
use crate::state_enum;
use serde_json::Value;

pub const MACHINE_ID: &str = "establish-user";

/// Context key holding the established user record.
pub const USER: &str = "user";

/// Events sent by the user lookup collaborator.
pub mod events {
    /// Carries `user`
    pub const LOADED: &str = "LOADED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const HAS_ACCOUNT: &str = "HAS_ACCOUNT";
    pub const NEEDS_ACCOUNT: &str = "NEEDS_ACCOUNT";
    /// Carries `user`
    pub const SIGN_IN_SUCCESS: &str = "SIGN_IN_SUCCESS";
    pub const SIGN_IN_FAIL: &str = "SIGN_IN_FAIL";
    /// Carries `user`
    pub const REGISTER_SUCCESS: &str = "REGISTER_SUCCESS";
    pub const REGISTER_FAIL: &str = "REGISTER_FAIL";
}

state_enum! {
    /// States of the Establish-User machine.
    pub enum EstablishStep {
        Loading = "loading",
        Choosing = "choosing",
        SignIn = "signIn",
        Registration = "registration",
        Complete = "complete",
    }
    final: [Complete]
}

pub fn definition() -> Result<MachineDefinition, BuildError> {
    use self::events::*;

    let save_user = |target: &str| TransitionBuilder::to(target).effect("saveUser");

    DefinitionBuilder::new(MACHINE_ID)
        .initial("loading")
        .state(
            StateBuilder::new("loading")
                .on(LOADED, save_user("complete"))
                .goto(NOT_FOUND, "choosing"),
        )
        .state(
            StateBuilder::new("choosing")
                .goto(HAS_ACCOUNT, "signIn")
                .goto(NEEDS_ACCOUNT, "registration"),
        )
        .state(
            StateBuilder::new("signIn")
                .on(SIGN_IN_SUCCESS, save_user("complete"))
                .goto(SIGN_IN_FAIL, "signIn"),
        )
        .state(
            StateBuilder::new("registration")
                .on(REGISTER_SUCCESS, save_user("complete"))
                .goto(REGISTER_FAIL, "registration"),
        )
        .state(StateBuilder::new("complete").output(OutputBuilder::Field(USER.to_string())))
        .build()
}

/// `saveUser` copies the event's `user` payload into context.
pub fn effects() -> EffectTable {
    EffectTable::new().assign("saveUser", |input| {
        let mut patch = ContextPatch::new();
        let user = input.event.get(USER).cloned().unwrap_or(Value::Null);
        patch.insert(USER.to_string(), user);
        patch
    })
}
