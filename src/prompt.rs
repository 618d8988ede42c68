//! Dynamic system prompt assembly.
//!
//! Builds the voice assistant's system prompt from the admin-edited college
//! record and agent configuration, plus enrichment blocks (live notices and
//! retrieved knowledge). The admission flow block sits on top and overrides
//! the answer-only-from-prompt rule: when the caller asks about admission,
//! the assistant walks the fixed five-question tool flow instead of reciting
//! contact details.

use serde_json::{json, Value};

use crate::enrich::EnrichedContext;
use crate::models::{AgentConfig, CollegeInfo};

/// Wire names of the tools the assistant may call back into the webhook.
pub const TOOL_ADMISSION_QUESTION: &str = "getAdmissionQuestion";
pub const TOOL_SUBMIT_LEAD: &str = "submitAdmissionLead";

/// The fixed question script, indexed by step 1..=5.
pub const ADMISSION_QUESTIONS: [&str; 5] = [
    "Great! I'll take a few details for our admissions team. May I know your full name?",
    "Thank you. May I know your age?",
    "What is your 12th grade percentage?",
    "Which course are you interested in?",
    "Which city or area are you from?",
];

pub fn build_system_prompt(
    college: &CollegeInfo,
    agent: &AgentConfig,
    enriched: &EnrichedContext,
) -> String {
    let course_list = if college.courses.is_empty() {
        "Contact us for details.".to_string()
    } else {
        college
            .courses
            .iter()
            .map(|c| {
                let mut line = format!(
                    "• {}: Fees — {}, Duration — {}, Eligibility — {}",
                    c.name,
                    or_na(&c.fees),
                    or_na(&c.duration),
                    or_na(&c.eligibility)
                );
                if !c.description.is_empty() {
                    line.push_str(". ");
                    line.push_str(&c.description);
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let facility_list = if college.facilities.is_empty() {
        "World-class facilities available.".to_string()
    } else {
        college
            .facilities
            .iter()
            .map(|f| format!("• {}: {}", f.name, f.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let leadership: Vec<&str> = [
        college.founder.as_str(),
        college.chairman.as_str(),
        college.director.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();

    let founder_block = if leadership.is_empty() {
        String::new()
    } else {
        format!(
            "\n### Founder & Leadership (answer from this data when asked):\n\
             When the caller asks about the founder, chairman, director, or who started \
             {name}, answer from the data below. Do not say you could not find information \
             and do not offer to transfer the call for this question.\n\
             Leadership data: {data}\n",
            name = college.name,
            data = leadership.join(". ")
        )
    };

    let base_prompt = if agent.system_prompt.is_empty() {
        format!(
            "You are an AI admissions assistant for {}. Be warm, concise, and professional.",
            college.name
        )
    } else {
        agent.system_prompt.clone()
    };

    let about = if college.about.is_empty() {
        "A premier institution of higher learning.".to_string()
    } else {
        college.about.clone()
    };

    let fallback_block = if agent.fallback_message.is_empty() {
        String::new()
    } else {
        format!("\n### If unsure: {}", agent.fallback_message)
    };

    format!(
        "\n### ADMISSION FLOW (OVERRIDES EVERYTHING BELOW — use the tools):\n\
         When the caller says \"admission\", \"I want admission\", \"admission enquiry\", \
         \"take admission\", or \"how to apply\" — do NOT recite website or phone details. \
         Use {q_tool}: step 1=name, 2=age, 3=12th grade percentage, 4=course, 5=city. Say \
         exactly the \"messageToSay\" from each result. After you have all 5 answers, call \
         {s_tool} with fullName, age, twelfthPercentage, course, city. Then say: \"Thank you. \
         Your details have been recorded and our admission team will contact you soon.\"\n\
         \n\
         ### RULE (with admission exception):\n\
         For general questions: answer ONLY from this system prompt. No external knowledge. \
         When they say admission: call {q_tool}(step: 1) and say the returned messageToSay. \
         If unsure about other topics, offer to connect to admissions.\n\
         ---\n\
         {base}\n\
         \n\
         ### Current College Information:\n\
         College Name: {name}\n\
         About: {about}\n\
         Tagline: {tagline}\n\
         {founder_block}\n\
         ### Courses & Fees:\n\
         {courses}\n\
         \n\
         ### Campus Facilities:\n\
         {facilities}\n\
         \n\
         ### Contact:\n\
         Phone: {phone}\n\
         Email: {email}\n\
         Address: {address}\n\
         {notices}{rag}{fallback}",
        q_tool = TOOL_ADMISSION_QUESTION,
        s_tool = TOOL_SUBMIT_LEAD,
        base = base_prompt,
        name = college.name,
        about = about,
        tagline = college.tagline,
        founder_block = founder_block,
        courses = course_list,
        facilities = facility_list,
        phone = or_na(&college.contact.phone),
        email = or_na(&college.contact.email),
        address = or_na(&college.contact.address),
        notices = enriched.live_notices_text,
        rag = enriched.rag_chunks_text,
        fallback = fallback_block,
    )
    .trim()
    .to_string()
}

pub fn first_message(college: &CollegeInfo, agent: &AgentConfig) -> String {
    if agent.first_message.is_empty() {
        format!(
            "Hello! Welcome to {}. I am your AI admissions assistant. How can I help you today?",
            college.name
        )
    } else {
        agent.first_message.clone()
    }
}

pub fn end_call_message(college: &CollegeInfo, agent: &AgentConfig) -> String {
    if agent.end_call_message.is_empty() {
        format!(
            "Thank you for contacting {}. If you have any questions, feel free to call us \
             anytime. Have a great day!",
            college.name
        )
    } else {
        agent.end_call_message.clone()
    }
}

/// The transient assistant object returned to the voice platform on an
/// assistant request.
pub fn assistant_payload(
    college: &CollegeInfo,
    agent: &AgentConfig,
    enriched: &EnrichedContext,
) -> Value {
    let system_prompt = build_system_prompt(college, agent, enriched);

    json!({
        "assistant": {
            "name": format!("{} AI Assistant", college.name),
            "firstMessage": first_message(college, agent),
            "endCallMessage": end_call_message(college, agent),
            "model": {
                "provider": "openai",
                "model": "gpt-3.5-turbo",
                "temperature": 0.7,
                "messages": [{ "role": "system", "content": system_prompt }],
                "tools": [admission_question_tool(), submit_lead_tool()],
            },
            "recordingEnabled": false,
            "endCallFunctionEnabled": true,
        }
    })
}

pub fn admission_question_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_ADMISSION_QUESTION,
            "description": "Get the exact phrase to say for the admission flow. Step 1=name, \
                            2=age, 3=12th%, 4=course, 5=city. After step 5, call submitAdmissionLead \
                            with all 5 answers, then say thank you.",
            "parameters": {
                "type": "object",
                "properties": {
                    "step": { "type": "number", "description": "1=name, 2=age, 3=12th%, 4=course, 5=city" }
                },
                "required": ["step"],
            },
        },
    })
}

pub fn submit_lead_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": TOOL_SUBMIT_LEAD,
            "description": "Call this AFTER collecting all 5 details: full name, age, 12th grade \
                            percentage, course, city. Saves the lead. Call once with all parameters.",
            "parameters": {
                "type": "object",
                "properties": {
                    "fullName": { "type": "string", "description": "Caller full name" },
                    "age": { "type": "string", "description": "Age or class" },
                    "twelfthPercentage": { "type": "string", "description": "12th grade percentage" },
                    "course": { "type": "string", "description": "Course interested in" },
                    "city": { "type": "string", "description": "City or area" },
                },
                "required": ["fullName", "age", "twelfthPercentage", "course", "city"],
            },
        },
    })
}

fn or_na(s: &str) -> &str {
    if s.is_empty() {
        "N/A"
    } else {
        s
    }
}
