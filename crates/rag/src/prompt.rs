//! Prompt assembly.
//!
//! Every prompt the pipeline sends is built here:
//!
//! 1. **Grounded**: compliance persona, numbered `[CHUNK i]` context, mandatory citations
//! 2. **Personalized**: advisor persona, profile block, optional memory block, no citations
//! 3. **Contextualize**: rewrite a follow-up into a standalone question
//! 4. **Compression**: merge memory, profile snapshot, and the latest exchange
//!
//! Assembly is deterministic: identical inputs always produce identical
//! prompts. Chunk order is preserved so citation indices match rank order.

use std::fmt::Write;

use finrag_core::memory::{CompressedMemory, MemorySection};
use finrag_core::message::ConversationTurn;
use finrag_core::profile::ProfileSnapshot;

use crate::budget::QueryComplexity;

const COMPLIANCE_PERSONA: &str = "You are a professional Financial Compliance Assistant.";
const ADVISOR_PERSONA: &str =
    "You are a professional Personal Financial Advisor AI having a natural conversation with a user.";

/// Builds prompt text. Stateless apart from the memory word limit.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    memory_word_limit: usize,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(400)
    }
}

impl PromptAssembler {
    pub fn new(memory_word_limit: usize) -> Self {
        Self { memory_word_limit }
    }

    /// Number chunks 1-based in rank order.
    pub fn format_chunks(chunks: &[String]) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let _ = write!(out, "--- [CHUNK {}] ---\n{}\n\n", i + 1, chunk);
        }
        out
    }

    /// Citation-grounded prompt for the plain RAG flow.
    pub fn grounded(&self, query: &str, chunks: &[String], complexity: QueryComplexity) -> String {
        format!(
            "{COMPLIANCE_PERSONA}\n\
             {hint}\n\
             \n\
             Your task is to answer the user's question using ONLY the provided context chunks.\n\
             \n\
             CORE INSTRUCTIONS:\n\
             1. **Analytical Argumentation**: Build a logical explanation based on the evidence.\n\
             2. **Mandatory Citations**: You MUST cite the specific chunk(s) used using [CHUNK X].\n\
             3. **Strict Grounding**: Only use the provided context.\n\
             \n\
             Context Chunks:\n\
             {context}\n\
             User Question: {query}\n\
             \n\
             Answer:\n",
            hint = complexity.style_hint(),
            context = Self::format_chunks(chunks),
        )
    }

    /// Profile-personalized prompt. Cites nothing and never mentions the memory.
    pub fn personalized(
        &self,
        query: &str,
        chunks: &[String],
        profile_context: &str,
        memory: Option<&CompressedMemory>,
    ) -> String {
        let memory_block = match memory.filter(|m| !m.is_empty()) {
            Some(m) => format!(
                "\n=== CONVERSATION MEMORY ===\n\
                 {m}\n\
                 ===========================\n\
                 Use the above memory to maintain continuity but do NOT mention it in your response.\n"
            ),
            None => String::new(),
        };

        format!(
            "{ADVISOR_PERSONA}\n\
             \n\
             Use the user's financial profile and the retrieved knowledge context below to give a precise, personalized answer.\n\
             \n\
             {profile_context}\n\
             {memory_block}\n\
             Knowledge Context:\n\
             {context}\n\
             \n\
             User Question: {query}\n\
             \n\
             Instructions:\n\
             - Tailor your answer using the user's specific financial numbers (income, savings, risk profile, assets, goals).\n\
             - Use information from the knowledge context to support your advice, but do NOT cite sources or mention chunk numbers.\n\
             - Do NOT reference \"previous context\", \"conversation history\", or \"memory\" in your response.\n\
             - Speak naturally and directly as a financial advisor would.\n\
             - Be concise, actionable, and specific to this user's situation.\n\
             \n\
             Answer:\n",
            context = Self::format_chunks(chunks),
        )
    }

    /// Rewrite instruction for the contextualizer. `turns` is already windowed.
    pub fn contextualize(&self, query: &str, turns: &[ConversationTurn]) -> String {
        let mut history = String::new();
        for turn in turns {
            let _ = writeln!(history, "{}: {}", turn.role.label(), turn.content);
        }

        format!(
            "Given the following conversation history and a new followup question, \
             rewrite the followup question into a STANDALONE question that can be understood \
             without the history. If the question is already standalone, return it EXACTLY as-is.\n\
             \n\
             Conversation History:\n\
             {history}\n\
             Followup Question: {query}\n\
             \n\
             Standalone Question:\n"
        )
    }

    /// Memory-merge instruction for the compressor.
    pub fn compression(
        &self,
        previous: Option<&CompressedMemory>,
        query: &str,
        answer: &str,
        snapshot: &ProfileSnapshot,
    ) -> String {
        let previous_block = match previous.filter(|m| !m.is_empty()) {
            Some(m) => format!("Previous History:\n{m}"),
            None => "No previous history.".to_string(),
        };

        let mut sections = String::new();
        for section in MemorySection::ALL {
            let _ = writeln!(sections, "{}: {}", section.header(), section.guidance());
        }

        format!(
            "You are a financial conversation memory manager.\n\
             \n\
             Your task is to produce a DETAILED memory snapshot (max {limit} words) that a future AI advisor \
             can read to fully understand this user's financial situation, what was discussed, and what advice was given.\n\
             \n\
             Structure your output with these sections:\n\
             \n\
             {sections}\n\
             Rules:\n\
             - Preserve ALL important financial details and advice from previous history\n\
             - Add new information from the latest exchange\n\
             - Remove only truly redundant or filler content\n\
             - Keep specific numbers, dates, and amounts, these are critical for continuity\n\
             - Write in a factual, third-person style\n\
             \n\
             {previous_block}\n\
             \n\
             User Financial Profile Snapshot:\n\
             {snapshot}\n\
             \n\
             Latest Exchange:\n\
             Q: {query}\n\
             A: {answer}\n\
             \n\
             Detailed Memory Snapshot:\n",
            limit = self.memory_word_limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<String> {
        vec![
            "KYC applies to all bank accounts.".to_string(),
            "NRIs must submit a passport copy.".to_string(),
        ]
    }

    #[test]
    fn chunks_are_numbered_in_order() {
        let text = PromptAssembler::format_chunks(&chunks());
        assert_eq!(
            text,
            "--- [CHUNK 1] ---\nKYC applies to all bank accounts.\n\n\
             --- [CHUNK 2] ---\nNRIs must submit a passport copy.\n\n"
        );
    }

    #[test]
    fn empty_chunks_render_nothing() {
        assert_eq!(PromptAssembler::format_chunks(&[]), "");
    }

    #[test]
    fn grounded_prompt_structure() {
        let p = PromptAssembler::default().grounded("What is KYC?", &chunks(), QueryComplexity::Simple);
        assert!(p.starts_with(COMPLIANCE_PERSONA));
        assert!(p.contains("BE EXTREMELY CONCISE"));
        assert!(p.contains("using ONLY the provided context chunks"));
        assert!(p.contains("[CHUNK X]"));
        assert!(p.contains("--- [CHUNK 2] ---"));
        assert!(p.contains("User Question: What is KYC?"));
        assert!(p.trim_end().ends_with("Answer:"));

        let persona = p.find(COMPLIANCE_PERSONA).unwrap();
        let context = p.find("Context Chunks:").unwrap();
        let question = p.find("User Question:").unwrap();
        assert!(persona < context && context < question);
    }

    #[test]
    fn grounded_prompt_complex_hint() {
        let p = PromptAssembler::default().grounded("q", &[], QueryComplexity::Complex);
        assert!(p.contains("analytical argumentation"));
        assert!(!p.contains("BE EXTREMELY CONCISE"));
    }

    #[test]
    fn personalized_prompt_with_memory() {
        let memory = CompressedMemory::new("**PROFILE SUMMARY**: saves 30%");
        let p = PromptAssembler::default().personalized(
            "Should I buy term insurance?",
            &chunks(),
            "=== USER FINANCIAL PROFILE ===\nName: Asha",
            Some(&memory),
        );
        assert!(p.starts_with(ADVISOR_PERSONA));
        assert!(p.contains("=== CONVERSATION MEMORY ===\n**PROFILE SUMMARY**: saves 30%\n"));
        assert!(p.contains("do NOT mention it in your response"));
        assert!(p.contains("do NOT cite sources or mention chunk numbers"));
        assert!(p.contains("Name: Asha"));
        assert!(p.contains("--- [CHUNK 1] ---"));
        assert!(!p.contains("[CHUNK X]"));
    }

    #[test]
    fn personalized_prompt_without_memory() {
        let blank = CompressedMemory::new("   ");
        for memory in [None, Some(&blank)] {
            let p = PromptAssembler::default().personalized("q", &[], "profile", memory);
            assert!(!p.contains("CONVERSATION MEMORY"));
        }
    }

    #[test]
    fn contextualize_prompt_lists_turns() {
        let turns = vec![
            ConversationTurn::user("What are RBI KYC norms?"),
            ConversationTurn::assistant("Banks must verify identity."),
        ];
        let p = PromptAssembler::default().contextualize("What about for NRIs?", &turns);
        assert!(p.contains("User: What are RBI KYC norms?\nAssistant: Banks must verify identity.\n"));
        assert!(p.contains("Followup Question: What about for NRIs?"));
        assert!(p.contains("return it EXACTLY as-is"));
        assert!(p.trim_end().ends_with("Standalone Question:"));
    }

    #[test]
    fn compression_prompt_sections_and_inputs() {
        let snapshot = ProfileSnapshot::new("Name: Asha | Age: 31");
        let p = PromptAssembler::default().compression(None, "q1", "a1", &snapshot);
        for section in MemorySection::ALL {
            assert!(p.contains(section.header()));
        }
        assert!(p.contains("max 400 words"));
        assert!(p.contains("No previous history."));
        assert!(p.contains("User Financial Profile Snapshot:\nName: Asha | Age: 31"));
        assert!(p.contains("Latest Exchange:\nQ: q1\nA: a1"));
    }

    #[test]
    fn compression_prompt_includes_previous_memory() {
        let previous = CompressedMemory::new("**ACTIVE GOALS**: house");
        let p = PromptAssembler::new(250).compression(
            Some(&previous),
            "q",
            "a",
            &ProfileSnapshot::default(),
        );
        assert!(p.contains("Previous History:\n**ACTIVE GOALS**: house"));
        assert!(p.contains("max 250 words"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = PromptAssembler::default();
        assert_eq!(
            a.grounded("q", &chunks(), QueryComplexity::Complex),
            a.grounded("q", &chunks(), QueryComplexity::Complex)
        );
    }
}
