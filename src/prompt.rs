//! Pure prompt composition: mode + target language + optional resume
//! grounding in, system and user messages out.

pub struct PromptInput<'a> {
    pub prompt: &'a str,
    pub attachments: &'a [String],
    pub language: &'a str,
    pub resume_context: Option<&'a str>,
}

pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
}

pub fn build(input: &PromptInput) -> BuiltPrompt {
    let system = match input.resume_context {
        Some(resume) => resume_system_prompt(resume, input.language),
        None => format!(
            "You are a coding/aptitude assistant that provides solutions in {}.",
            input.language
        ),
    };

    let user = if input.attachments.is_empty() {
        match input.resume_context {
            Some(_) => format!(
                "Question: {}\n\nPlease answer this question based on my resume background and experience.",
                input.prompt
            ),
            None => input.prompt.to_string(),
        }
    } else {
        screenshot_prompt(input.attachments.len(), input.language)
    };

    BuiltPrompt { system, user }
}

fn resume_system_prompt(resume: &str, language: &str) -> String {
    format!(
        "You are an interview assistant with access to the user's resume. Answer every \
         question from the user's actual background and experience.\n\n\
         RESUME CONTEXT:\n{resume}\n\n\
         IMPORTANT INSTRUCTIONS:\n\
         1. Always answer from the user's perspective, drawing on the resume where relevant\n\
         2. If a question asks about something not covered by the resume, give a very short direct answer\n\
         3. Keep answers concise and interview-ready\n\
         4. Use specific examples from the resume when possible\n\
         5. For coding or definition questions, provide the definition and solution in {language} and do not use resume content there\n\
         6. Be honest about limitations based on the resume content\n\
         7. NEVER introduce yourself as an AI assistant - always answer as the person from the resume"
    )
}

fn screenshot_prompt(image_count: usize, language: &str) -> String {
    let mut prompt = String::new();
    if image_count > 1 {
        prompt.push_str(&format!(
            "There are {image_count} images that are all part of the same question or \
             problem. Analyze them together as one combined problem, observe every part \
             of each image carefully, and reason step by step before giving the final \
             answer.\n\n"
        ));
    }
    prompt.push_str(&format!(
        "You are an expert coding and aptitude interview assistant. Analyze the image(s) \
         for either a coding problem or an aptitude/option-based question.\n\n\
         If it is a coding problem and a candidate solution is already visible in the \
         image, respond with exactly three sections:\n\n\
         Comparison:\n\
         - Compare the provided solution with an optimized one. If the provided solution \
         is wrong, correct it and provide the updated solution.\n\n\
         Optimized Solution:\n\
         - The best solution in {language}, completely formatted, comments allowed.\n\n\
         Complexity:\n\
         - Time Complexity: ...\n\
         - Space Complexity: ...\n\n\
         If only the problem statement (or a bare code skeleton) is visible, respond with \
         exactly three sections:\n\n\
         Approach:\n\
         - Three concise bullet points describing the approach, phrased so they can be \
         read directly to an interviewer.\n\n\
         Solution:\n\
         - The complete solution in {language}, filled into the given skeleton without \
         renaming any functions.\n\n\
         Complexity:\n\
         - Time Complexity: ...\n\
         - Space Complexity: ...\n\n\
         If it is an aptitude or option-based question, carefully observe every part of \
         the screenshot (question, diagram, data), think step by step, and ensure complete \
         accuracy before answering. Then respond in exactly two sections:\n\n\
         Answer:\n\
         - State the correct answer option clearly and confidently.\n\n\
         Short Explanation:\n\
         - A step-by-step explanation of how the answer was derived, using concise logic, \
         calculations, or elimination, understandable by a non-expert reader.\n\
         - Plain text only: no markdown, bold, or unnecessary symbols.\n\n\
         Do NOT introduce yourself. Do NOT add headers or summaries beyond the sections \
         described. Prioritize clarity and correctness."
    ));
    prompt
}

/// Prompt sent once after a resume upload so the model digests the extracted
/// text before interview questions arrive.
pub fn resume_analysis_prompt(extracted: &str) -> String {
    format!(
        "Please analyze this resume and extract the key information about my general \
         details, background, skills, experience, and projects.\n\n\
         RESUME CONTENT:\n{extracted}\n\n\
         Provide a structured summary of my background that can be used for answering \
         interview questions. Focus on:\n\
         - Technical skills and programming languages\n\
         - Work experience and projects\n\
         - Education and certifications\n\
         - Key achievements and responsibilities"
    )
}
