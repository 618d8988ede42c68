//! Default data seeding.
//!
//! Inserts the baseline college record, agent configuration, and message
//! templates so a fresh install can answer calls immediately. Existing rows
//! are left untouched — admins edit these through the UI and a re-seed must
//! not clobber their changes.

use anyhow::Result;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::models::{AgentConfig, CollegeInfo, Contact, Course, Facility, MessageTemplate};
use crate::store;

pub async fn run_seed(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let mut seeded = Vec::new();

    if store::load_college_info(&pool).await?.is_none() {
        store::save_college_info(&pool, &default_college()).await?;
        seeded.push("college info");
    }

    if store::load_agent_config(&pool).await?.is_none() {
        store::save_agent_config(&pool, &default_agent_config()).await?;
        seeded.push("agent config");
    }

    if store::load_template(&pool, "post_call_sms").await?.is_none() {
        store::save_template(
            &pool,
            &MessageTemplate {
                id: Uuid::new_v4().to_string(),
                name: "post_call_sms".to_string(),
                channel: "sms".to_string(),
                subject: None,
                body: "Thanks for calling {{college}}! {{summary}} Visit {{website}} for more info."
                    .to_string(),
            },
        )
        .await?;
        seeded.push("sms template");
    }

    if store::load_template(&pool, "enquiry_thank_you").await?.is_none() {
        store::save_template(
            &pool,
            &MessageTemplate {
                id: Uuid::new_v4().to_string(),
                name: "enquiry_thank_you".to_string(),
                channel: "email".to_string(),
                subject: Some("Thank you for contacting {{college}}!".to_string()),
                body: "Hi, thank you for your enquiry regarding {{course}}. Our admissions team \
                       will get back to you shortly. Visit {{website}} for more info."
                    .to_string(),
            },
        )
        .await?;
        seeded.push("email template");
    }

    println!("seed");
    if seeded.is_empty() {
        println!("  nothing to do, all defaults present");
    } else {
        println!("  seeded: {}", seeded.join(", "));
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

fn default_college() -> CollegeInfo {
    let btech = |name: &str| Course {
        name: name.to_string(),
        duration: "4 Years".to_string(),
        fees: "Contact for current fee structure".to_string(),
        eligibility: "12th with PCM, JEE/OUAT".to_string(),
        description: String::new(),
    };

    CollegeInfo {
        name: "Balasore College of Engineering and Technology".to_string(),
        tagline: "25 Glorious Years of Excellence (2001–2025)".to_string(),
        about: "BCET saw light in the year 2001 at Balasore, Odisha. Managed by Fakir Mohan \
                Educational and Charitable Trust, it is approved by AICTE, recognized by Govt. \
                of Odisha, and affiliated to BPUT."
            .to_string(),
        founder: "Dr. Manmath Kumar Biswal".to_string(),
        chairman: "Dr. Manmath Kumar Biswal (Founder-Chairman)".to_string(),
        director: "Prof. (Dr.) Ratikanta Sahoo".to_string(),
        website: "bcetodisha.ac.in".to_string(),
        admission_process: "Admissions through JEE/OUAT for B.Tech. Visit \
                            bcetodisha.ac.in/admission.php or call the admission helpline."
            .to_string(),
        contact: Contact {
            email: "principal@bcetodisha.ac.in".to_string(),
            phone: "(06782) 236045, 9777938474, 9437961413".to_string(),
            address: "NH-16, Sergarh, Balasore (756060), Odisha".to_string(),
        },
        courses: vec![
            btech("B.Tech Computer Science & Engineering"),
            btech("B.Tech Information Technology"),
            btech("B.Tech Electrical Engineering"),
            btech("B.Tech Mechanical Engineering"),
            btech("B.Tech Civil Engineering"),
            Course {
                name: "MBA".to_string(),
                duration: "2 Years".to_string(),
                fees: "Contact for current fee structure".to_string(),
                eligibility: "Graduation in any stream".to_string(),
                description: String::new(),
            },
            Course {
                name: "MCA".to_string(),
                duration: "3 Years".to_string(),
                fees: "Contact for current fee structure".to_string(),
                eligibility: "Graduation with Mathematics".to_string(),
                description: String::new(),
            },
        ],
        facilities: vec![
            Facility {
                name: "Digital Classrooms".to_string(),
                description: "Digital classes in all classrooms with modern teaching aids"
                    .to_string(),
            },
            Facility {
                name: "Central Library".to_string(),
                description: "Extensive collection of books and digital resources".to_string(),
            },
            Facility {
                name: "Hostel".to_string(),
                description: "Dr. APJ Abdul Kalam Hall of Residence — Wi-Fi enabled, mess, \
                              24/7 security"
                    .to_string(),
            },
            Facility {
                name: "Sports Complex".to_string(),
                description: "Annual Sports Meet and Charisma cultural fest".to_string(),
            },
        ],
    }
}

fn default_agent_config() -> AgentConfig {
    AgentConfig {
        system_prompt: "You are an AI admissions assistant for Balasore College of Engineering \
                        and Technology (BCET), Odisha. When callers say \"admission\" or want to \
                        apply, you MUST ask their name, age, 12th percentage, course, and city \
                        one at a time. Otherwise answer questions about courses, fees, \
                        eligibility, hostel, and the admission process. Be warm, concise, and \
                        professional."
            .to_string(),
        first_message: "Hello! Welcome to BCET - Balasore College of Engineering and Technology. \
                        I'm your AI admissions assistant. How can I help you today?"
            .to_string(),
        end_call_message: String::new(),
        fallback_message: "I'm sorry, I couldn't find information on that. Let me connect you \
                           with our admissions team."
            .to_string(),
        tone: "friendly".to_string(),
        language: "English".to_string(),
        live_data_url: None,
        rag_enabled: false,
    }
}
