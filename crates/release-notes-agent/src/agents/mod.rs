//! Agent builders for the release-notes writer.
//!
//! Each agent is built via a free function that returns
//! `Agent<openai::completion::CompletionModel>`. The `AgentFactory` ties them
//! together using the rig client and `NotesConfig`.

pub mod writer;

use anyhow::Result;
use rig::agent::Agent;
use rig::providers::openai;

use crate::config::{build_client, NotesConfig};
use crate::drafter::AgentDrafter;

/// Type alias for agents built from OpenAI-compatible endpoints.
pub type OaiAgent = Agent<openai::completion::CompletionModel>;

/// Factory that builds the writer agents from a `NotesConfig`.
pub struct AgentFactory {
    pub client: openai::CompletionsClient,
    pub config: NotesConfig,
}

impl AgentFactory {
    pub fn new(config: &NotesConfig) -> Result<Self> {
        let client = build_client(&config.endpoint)?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Tool-less writer for direct mode.
    pub fn build_direct_writer(&self) -> OaiAgent {
        writer::build_direct_writer(
            &self.client,
            &self.config.endpoint.model,
            self.config.temperature,
        )
    }

    /// Writer with `make_diff` and `get_release_notes` attached.
    pub fn build_tool_writer(&self, instructions: &str) -> OaiAgent {
        writer::build_tool_writer(&self.client, &self.config, instructions)
    }

    /// Direct-mode writer wrapped as a [`crate::drafter::Drafter`].
    pub fn direct_drafter(&self) -> AgentDrafter {
        AgentDrafter::new(
            "direct_writer",
            self.build_direct_writer(),
            self.config.max_retries,
        )
    }

    /// Tool-calling writer wrapped as a [`crate::drafter::Drafter`].
    pub fn tool_drafter(&self, instructions: &str) -> AgentDrafter {
        AgentDrafter::new(
            "tool_writer",
            self.build_tool_writer(instructions),
            self.config.max_retries,
        )
    }
}
