//! Turn state machine.
//!
//! A turn is one user send and the assistant response it streams back.
//! [`TurnMachine::begin`] inserts the optimistic messages; [`TurnMachine::apply`]
//! folds each decoded event into the placeholder, in arrival order, and
//! returns the side effects the controller must carry out. The machine does
//! no I/O.

use chat_types::{
    event::{StreamEvent, ToolDescriptor, TurnOutcome},
    message::{Attachment, Message, MessageId, Source},
    session::Session,
    tool::{ToolProgress, ToolStatus},
};

use crate::cancel::stop_message;
use crate::decoder::sources_from_result;

/// Content shown when the backend reports an error or the stream dies empty.
pub const ERROR_MESSAGE: &str =
    "Sorry, something went wrong while generating a response. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEffect {
    MessageUpdated,
    /// The session adopted its durable id; fires once per session
    SessionCreated { session_id: String },
    InvalidateCaches { session_id: String },
    Finished(TurnOutcome),
}

#[derive(Debug)]
pub struct TurnMachine {
    placeholder_id: MessageId,
    /// Sources per tool id, in first-report order
    sources_by_tool: Vec<(String, Vec<Source>)>,
    outcome: Option<TurnOutcome>,
}

impl TurnMachine {
    /// Append the user message and a streaming assistant placeholder.
    pub fn begin(session: &mut Session, content: &str, attachments: Vec<Attachment>) -> Self {
        let user = Message::user(content, attachments);
        let placeholder = Message::assistant_placeholder();
        let machine = Self {
            placeholder_id: placeholder.id.clone(),
            sources_by_tool: Vec::new(),
            outcome: None,
        };
        session.messages.push(user);
        session.messages.push(placeholder);
        session.touch();
        machine
    }

    pub fn placeholder_id(&self) -> &MessageId {
        &self.placeholder_id
    }

    pub fn outcome(&self) -> Option<TurnOutcome> {
        self.outcome
    }

    pub fn is_terminated(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn apply(&mut self, session: &mut Session, event: StreamEvent) -> Vec<TurnEffect> {
        if let Some(outcome) = self.outcome {
            log::warn!("Ignoring {} event after turn ended ({:?})", event.kind(), outcome);
            return Vec::new();
        }

        match event {
            StreamEvent::Final {
                answer,
                session_id,
                tools,
            } => self.apply_final(session, answer, session_id, tools),
            event => {
                let Some(message) = session.message_mut(&self.placeholder_id) else {
                    log::warn!("Placeholder {} is gone, dropping event", self.placeholder_id);
                    return Vec::new();
                };
                let (updated, effects) = self.apply_to_message(message, event);
                if updated {
                    let mut all = vec![TurnEffect::MessageUpdated];
                    all.extend(effects);
                    all
                } else {
                    effects
                }
            }
        }
    }

    fn apply_to_message(&mut self, message: &mut Message, event: StreamEvent) -> (bool, Vec<TurnEffect>) {
        match event {
            StreamEvent::Status { stage } => match stage.step_label() {
                Some(label) => (message.push_step(label), Vec::new()),
                None => {
                    log::debug!("Unknown stage {:?}, no step recorded", stage);
                    (false, Vec::new())
                }
            },

            StreamEvent::ToolsDecided { tools } => {
                message.tools = tools
                    .into_iter()
                    .map(|t| ToolProgress {
                        reasoning: t.reasoning,
                        ..ToolProgress::planned(t.id, t.tool_type.unwrap_or_default())
                    })
                    .collect();
                (true, Vec::new())
            }

            StreamEvent::ToolStart { tool } => {
                let entry = upsert_tool(message, &tool);
                entry.status = ToolStatus::Running;
                if tool.reasoning.is_some() {
                    entry.reasoning = tool.reasoning.clone();
                }
                let step = match &entry.reasoning {
                    Some(reasoning) if !reasoning.is_empty() => reasoning.clone(),
                    _ if entry.tool_type.is_empty() => "using tool".to_string(),
                    _ => format!("using {}", entry.tool_type),
                };
                message.push_step(step);
                (true, Vec::new())
            }

            StreamEvent::ToolEnd { tool, result } => {
                let result = result.or_else(|| tool.result.clone());
                update_tool(message, &tool);
                if let Some(result) = result {
                    self.record_sources(&tool.id, sources_from_result(&result));
                    message.sources = self.merged_sources();
                }
                (true, Vec::new())
            }

            StreamEvent::AnswerChunk { content } | StreamEvent::Raw(content) => {
                message.content.push_str(&content);
                (true, Vec::new())
            }

            StreamEvent::Error { message: reason } => {
                log::warn!(
                    "Backend reported an error: {}",
                    reason.as_deref().unwrap_or("<no message>")
                );
                message.content = ERROR_MESSAGE.to_string();
                message.is_streaming = false;
                self.outcome = Some(TurnOutcome::Failed);
                (true, vec![TurnEffect::Finished(TurnOutcome::Failed)])
            }

            // Routed through apply_final
            StreamEvent::Final { .. } => (false, Vec::new()),
        }
    }

    fn apply_final(
        &mut self,
        session: &mut Session,
        answer: String,
        session_id: Option<String>,
        tools: Option<Vec<ToolDescriptor>>,
    ) -> Vec<TurnEffect> {
        let mut effects = Vec::new();
        let mut created = None;

        let announced = session_id.filter(|id| !id.is_empty());
        match (session.id.clone(), announced) {
            (None, Some(id)) => {
                log::info!("Session created: {}", id);
                session.id = Some(id.clone());
                created = Some(TurnEffect::SessionCreated { session_id: id });
            }
            (Some(current), Some(id)) if current != id => {
                log::warn!("Final event names session {} but this is {}; keeping {}", id, current, current);
            }
            _ => {}
        }
        let invalidate = session.id.clone();

        let Some(message) = session.message_mut(&self.placeholder_id) else {
            log::warn!("Placeholder {} is gone, dropping final event", self.placeholder_id);
            self.outcome = Some(TurnOutcome::Completed);
            effects.extend(created);
            effects.push(TurnEffect::Finished(TurnOutcome::Completed));
            return effects;
        };

        message.content = answer;
        if let Some(tools) = tools {
            for tool in &tools {
                update_tool(message, tool);
                if let Some(result) = &tool.result {
                    self.record_sources(&tool.id, sources_from_result(result));
                }
            }
            message.sources = self.merged_sources();
        }
        message.is_streaming = false;
        self.outcome = Some(TurnOutcome::Completed);
        session.touch();

        effects.push(TurnEffect::MessageUpdated);
        effects.extend(created);
        if let Some(session_id) = invalidate {
            effects.push(TurnEffect::InvalidateCaches { session_id });
        }
        effects.push(TurnEffect::Finished(TurnOutcome::Completed));
        effects
    }

    /// Client-initiated stop.
    pub fn cancel(&mut self, session: &mut Session) -> Vec<TurnEffect> {
        if self.outcome.is_some() {
            return Vec::new();
        }
        self.outcome = Some(TurnOutcome::Cancelled);
        let stopped = session
            .message_mut(&self.placeholder_id)
            .map(stop_message)
            .unwrap_or(false);
        if stopped {
            vec![
                TurnEffect::MessageUpdated,
                TurnEffect::Finished(TurnOutcome::Cancelled),
            ]
        } else {
            vec![TurnEffect::Finished(TurnOutcome::Cancelled)]
        }
    }

    /// The stream ended with neither `final` nor `error`.
    ///
    /// Partial content is kept. An empty placeholder gets [`ERROR_MESSAGE`]
    /// when `synthesize_error` is set and is left empty otherwise.
    pub fn interrupt(&mut self, session: &mut Session, synthesize_error: bool) -> Vec<TurnEffect> {
        if self.outcome.is_some() {
            return Vec::new();
        }
        self.outcome = Some(TurnOutcome::Interrupted);
        let Some(message) = session.message_mut(&self.placeholder_id) else {
            return vec![TurnEffect::Finished(TurnOutcome::Interrupted)];
        };
        if message.content.is_empty() && synthesize_error {
            message.content = ERROR_MESSAGE.to_string();
        }
        message.is_streaming = false;
        vec![
            TurnEffect::MessageUpdated,
            TurnEffect::Finished(TurnOutcome::Interrupted),
        ]
    }

    /// Last writer per tool wins.
    fn record_sources(&mut self, tool_id: &str, sources: Vec<Source>) {
        match self.sources_by_tool.iter_mut().find(|(id, _)| id == tool_id) {
            Some((_, existing)) => *existing = sources,
            None => self.sources_by_tool.push((tool_id.to_string(), sources)),
        }
    }

    fn merged_sources(&self) -> Vec<Source> {
        let mut seen = std::collections::HashSet::new();
        self.sources_by_tool
            .iter()
            .flat_map(|(_, sources)| sources.iter())
            .filter(|s| seen.insert(s.id.clone()))
            .cloned()
            .collect()
    }
}

fn update_tool(message: &mut Message, tool: &ToolDescriptor) {
    let entry = upsert_tool(message, tool);
    match tool.status.as_deref().map(ToolStatus::from_wire) {
        Some(Some(status)) => entry.status = status,
        Some(None) => log::debug!("Unknown status for tool {}, keeping {:?}", tool.id, entry.status),
        None => {}
    }
    if tool.error.is_some() {
        entry.error = tool.error.clone();
    }
}

/// Find a tool by id, inserting it as pending if the plan never listed it.
fn upsert_tool<'a>(message: &'a mut Message, tool: &ToolDescriptor) -> &'a mut ToolProgress {
    let index = match message.tools.iter().position(|t| t.id == tool.id) {
        Some(index) => index,
        None => {
            message.tools.push(ToolProgress::planned(tool.id.clone(), String::new()));
            message.tools.len() - 1
        }
    };
    let entry = &mut message.tools[index];
    if entry.tool_type.is_empty() {
        if let Some(tool_type) = &tool.tool_type {
            entry.tool_type = tool_type.clone();
        }
    }
    entry
}
