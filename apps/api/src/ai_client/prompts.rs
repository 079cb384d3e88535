// Prompt text for the chat-completion calls made by `AiClient`.

pub const SKILL_EXTRACTION_SYSTEM: &str = "You are a technical recruiter extracting skills \
    from resumes. Return only a JSON array of skill names.";

pub const SKILL_EXTRACTION_PROMPT_TEMPLATE: &str = "\
Extract technical skills and technologies from the following resume text.
Return only a JSON array of skill names, no explanations.
Focus on programming languages, frameworks, tools, and technologies.

Resume text:
{text}";

pub const JOB_ANALYSIS_SYSTEM: &str = "You are a technical recruiter analyzing job \
    descriptions. Return only valid JSON.";

pub const JOB_ANALYSIS_PROMPT_TEMPLATE: &str = "\
Analyze this job description and extract:
1. Must-have technical skills (required)
2. Nice-to-have skills (preferred)
3. Experience level (junior/mid/senior)

Return a JSON object with keys: must_have, nice_to_have, experience_level

Job description:
{job_description}";
