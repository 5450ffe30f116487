//! Bridges to the Rig agent ecosystem

pub mod rig_agent_adapter;

pub use rig_agent_adapter::RigAgentAdapter;
