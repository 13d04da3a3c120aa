//! # LLM Intent Router
//!
//! Classifies questions with two chat-completion calls against an
//! OpenAI-compatible endpoint: first the domain, then a decision object
//! `{"decision": ..., "entity_name": ...}` restricted to that domain's intents.
//! The same endpoint phrases the structured answer for the user and answers
//! general questions on its own.
//!
//! Calls are blocking; run `classify` and the phrasing calls off the async
//! runtime.

use crate::config::LlmConfig;
use reqwest::blocking::Client;
use semnet_core::{
    Answer, AnswerPhraser, Classification, Domain, Intent, IntentRouter, SemnetError,
    parse_decision,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// =============================================================================
// PROMPTS
// =============================================================================

/// System prompt for the first call: pick one domain label.
pub fn domain_prompt() -> String {
    let mut prompt = String::from(
        "You sort questions about a knowledge base into exactly one category.\n\
         Categories:\n",
    );
    for (n, domain) in Domain::ALL.into_iter().enumerate() {
        prompt.push_str(&format!("{}. \"{}\": {}\n", n + 1, domain.label(), scope(domain)));
        prompt.push_str("   Example questions:\n");
        for example in domain_examples(domain) {
            prompt.push_str(&format!("   - \"{}\"\n", example));
        }
    }
    prompt.push_str("Reply with the category name only, copied exactly as listed.");
    prompt
}

/// System prompt for the second call: pick a decision for `domain` and
/// extract the entity name.
pub fn decision_prompt(domain: Domain) -> String {
    let mut prompt = format!(
        "The question belongs to the category \"{}\": {}\nPossible decisions:\n",
        domain.label(),
        scope(domain)
    );
    for intent in domain.intents() {
        prompt.push_str(&format!("- {}: {}\n", intent.decision(), purpose(*intent)));
        let examples = intent_examples(*intent);
        if !examples.is_empty() {
            let quoted: Vec<String> = examples.iter().map(|e| format!("\"{}\"", e)).collect();
            prompt.push_str(&format!("  Examples: {}\n", quoted.join(", ")));
        }
    }
    prompt.push_str(
        "Entity name rules:\n\
         - if the question quotes the entity, copy the whole quoted text verbatim, \
         leading words such as \"Раздел.\" and the trailing period included;\n\
         - otherwise give the fullest entity name in its base form (nominative singular).\n\
         Examples:\n\
         \"Найди дочерние элементы дерева\" -> \
         {\"decision\": \"children_needed\", \"entity_name\": \"дерево\"}\n\
         \"В какую декомпозицию входит раздел 'Раздел. Общие сведения о предметной области'?\" -> \
         {\"decision\": \"parent_decomposition_needed\", \
         \"entity_name\": \"Раздел. Общие сведения о предметной области\"}\n\
         Reply with one JSON object {\"decision\": ..., \"entity_name\": ...} and nothing else, \
         without a code fence.",
    );
    prompt
}

/// System prompt for phrasing `answer` as the final reply.
pub fn answer_prompt(answer: &Answer) -> String {
    if answer.intent == Intent::Description {
        return format!(
            "Strip any HTML tags from the text below and return it as the final answer for \
             the user, with no other changes.\nText: {}",
            answer.joined()
        );
    }

    let heading = heading(answer.intent);
    format!(
        "Entity: \"{entity}\"\n\
         {heading}: {items}\n\
         The items are separated by \"; \" only. Split on that separator and nowhere else.\n\
         Reply in this format and nothing else:\n\
         Сущность: {entity}\n\
         {heading}:\n\
         - first item\n\
         - second item\n\
         Write \"- (пусто)\" as the only item if there are none.",
        entity = answer.entity_name,
        heading = heading,
        items = answer.joined(),
    )
}

/// System prompt for questions the knowledge base does not cover.
pub fn general_prompt() -> String {
    "You are an information support assistant. The question does not need the \
     knowledge base. Answer it from your own knowledge as plain text."
        .to_string()
}

fn scope(domain: Domain) -> &'static str {
    match domain {
        Domain::StructureAndHierarchy => {
            "questions about what an entity consists of, what it is part of, \
             which decomposition it belongs to, and the stages of a process"
        }
        Domain::DescriptionAndCharacteristics => {
            "requests for a description or definition of an entity (\"what is it?\")"
        }
        Domain::ClassificationAndCategorization => {
            "questions about the classes an entity belongs to, the broadest \
             (maximum) class as well as narrower ones"
        }
        Domain::SemanticRelationships => {
            "questions about the key elements, aspects and concepts that reveal an entity"
        }
        Domain::General => {
            "anything not about the structure, description, classification or \
             key elements of an entity"
        }
    }
}

fn domain_examples(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::StructureAndHierarchy => &[
            "Найди дочерние элементы дерева",
            "Какие сущности входят в состав Солнечной системы?",
            "В какую декомпозицию входит раздел 'Кулинария'?",
            "Кто родители дерева?",
            "Из каких компонентов состоит рецепт?",
            "Составные части компьютера",
            "Элементы атомного ядра",
        ],
        Domain::DescriptionAndCharacteristics => &[
            "Дай описание рецепта",
            "Что такое слон?",
            "Описание для 'Сущность с точкой.' пожалуйста",
            "Охарактеризуйте компьютер",
            "Расскажите о Солнечной системе",
        ],
        Domain::ClassificationAndCategorization => &[
            "Какой максимальный класс объектов исследования у слона?",
            "Какие элементы являются максимальными классами у 'рецепт борща'?",
            "Какой не максимальный класс у слона?",
            "Назови более общий класс для 'рецепт борща'",
            "К какой категории относится рецепт?",
        ],
        Domain::SemanticRelationships => &[
            "Какие ключевые элементы рецепта?",
            "Найди важные SC-элементы для 'Солнечная система'",
            "Основные знания о дереве",
            "Важные аспекты компьютера",
        ],
        Domain::General => &[
            "Сколько будет 2 + 2?",
            "Рецепты вкусных блюд",
            "Погода на завтра",
            "Новости спорта",
        ],
    }
}

fn purpose(intent: Intent) -> &'static str {
    match intent {
        Intent::Children => "the entity's sub-elements",
        Intent::Parents => "what the entity is included in",
        Intent::ParentDecomposition => "the section the entity was decomposed from",
        Intent::Decompositions => "the sections the entity decomposes into",
        Intent::Description => "a textual description of the entity",
        Intent::MaxClass => "classes for which the entity is the main studied object",
        Intent::NotMaxClass => "classes the entity studies but not as the main object",
        Intent::KeyElements => "the key elements of the entity",
        Intent::StagesList => "the ordered stages of a process",
        Intent::General => "anything not about a specific entity",
        Intent::Unrecognized => "none of the above",
    }
}

fn intent_examples(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Children => &[
            "дочерние элементы дерева",
            "что входит в состав Солнечной системы",
            "из чего состоит атом",
            "компоненты рецептурного объекта",
        ],
        Intent::Parents => &[
            "родители дерева",
            "частью чего является атом",
            "к чему относится рецепт",
        ],
        Intent::ParentDecomposition => &[
            "в какую декомпозицию входит раздел 'Кулинария'",
            "какой декомпозиции принадлежит раздел 'Рецепты'",
            "декомпозиции для 'Раздел. Общие сведения'",
        ],
        Intent::Decompositions => &[
            "на какие разделы делится 'Кулинария'",
            "декомпозиция раздела 'Рецепты'",
        ],
        Intent::Description => &[
            "дай описание рецепта",
            "что такое слон?",
            "дефиниция понятия 'информационная система'",
        ],
        Intent::MaxClass => &[
            "какой максимальный класс объектов исследования у слона?",
            "высшая категория для автомобиля",
            "самый общий класс для понятия 'информационная система'",
        ],
        Intent::NotMaxClass => &[
            "какой не максимальный класс у слона?",
            "назови более общий класс для 'рецепт борща'",
            "промежуточная категория для 'Солнечная система'",
        ],
        Intent::KeyElements => &[
            "какие ключевые элементы рецепта?",
            "основные знания о дереве",
            "семантические связи понятия 'рецепт борща'",
        ],
        Intent::StagesList => &["этапы приготовления борща", "как приготовить 'рецепт борща'"],
        Intent::General | Intent::Unrecognized => &[],
    }
}

/// Heading of the item list in a phrased answer.
fn heading(intent: Intent) -> &'static str {
    match intent {
        Intent::Children => "Дочерние сущности",
        Intent::Parents => "Родительские сущности",
        Intent::ParentDecomposition => "Входит в декомпозиции",
        Intent::Decompositions => "Разделы декомпозиции",
        Intent::Description => "Описание",
        Intent::MaxClass => "Максимальный класс",
        Intent::NotMaxClass => "Более общий класс",
        Intent::KeyElements => "Ключевые SC-элементы",
        Intent::StagesList => "Этапы",
        Intent::General | Intent::Unrecognized => "Ответ",
    }
}

/// First choice's message content, trimmed.
fn first_content(response: ChatResponse) -> Result<String, SemnetError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| SemnetError::ClassificationFailed("empty completion".to_string()))
}

// =============================================================================
// ROUTER
// =============================================================================

/// `IntentRouter` backed by a chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmIntentRouter {
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl LlmIntentRouter {
    /// Read the key from `api_key_env` now; fail if that variable is unset.
    pub fn new(config: &LlmConfig) -> Result<Self, SemnetError> {
        let api_key = match &config.api_key_env {
            Some(var) => {
                let key = std::env::var(var).unwrap_or_default().trim().to_string();
                if key.is_empty() {
                    return Err(SemnetError::ClassificationFailed(format!(
                        "LLM key variable {} is not set",
                        var
                    )));
                }
                Some(key)
            }
            None => None,
        };

        Ok(Self {
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    // The blocking client owns a runtime of its own, so it is built on the
    // calling thread rather than stored.
    fn client(&self) -> Result<Client, SemnetError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| SemnetError::ClassificationFailed(format!("HTTP client: {}", e)))
    }

    fn complete(&self, client: &Client, system: &str, question: &str) -> Result<String, SemnetError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::new("system", system),
                ChatMessage::new("user", question),
            ],
            temperature: 0,
        };

        let mut request = client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().map_err(|e| {
            SemnetError::ClassificationFailed(format!("cannot reach {}: {}", self.url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(SemnetError::ClassificationFailed(format!(
                "{} returned {}: {}",
                self.url, status, text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| SemnetError::ClassificationFailed(format!("bad completion: {}", e)))?;
        first_content(parsed)
    }
}

impl IntentRouter for LlmIntentRouter {
    fn classify(&self, question: &str) -> Result<Classification, SemnetError> {
        let client = self.client()?;

        let label = self.complete(&client, &domain_prompt(), question)?;
        let domain = Domain::parse(&label).ok_or_else(|| {
            SemnetError::ClassificationFailed(format!("unknown domain label {:?}", label))
        })?;
        tracing::debug!(?domain, "domain classified");

        let raw = self.complete(&client, &decision_prompt(domain), question)?;
        parse_decision(domain, &raw)
    }
}

impl AnswerPhraser for LlmIntentRouter {
    fn phrase(&self, question: &str, answer: &Answer) -> Result<String, SemnetError> {
        let client = self.client()?;
        self.complete(&client, &answer_prompt(answer), question)
    }

    fn answer_general(&self, question: &str) -> Result<String, SemnetError> {
        let client = self.client()?;
        self.complete(&client, &general_prompt(), question)
    }
}

// =============================================================================
// TESTS
// =============================================================================
