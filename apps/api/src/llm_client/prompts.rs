// Resume extraction prompt templates.
// All prompts for the extraction client are defined here.

pub const RESUME_PARSE_SYSTEM: &str = "\
You are a precise resume parser. \
Extract structured information from resume text and return it as a single valid JSON object with exactly this schema:
{
  \"full_name\": \"string\" | null,
  \"email\": \"string\" | null,
  \"phone\": \"string\" | null,
  \"location\": \"string\" | null,
  \"summary\": \"string\" | null,
  \"skills\": [\"string\"],
  \"experience\": [
    {
      \"title\": \"string\" | null,
      \"company\": \"string\" | null,
      \"duration\": \"string\" | null,
      \"description\": \"string\" | null
    }
  ],
  \"education\": [
    {
      \"degree\": \"string\" | null,
      \"institution\": \"string\" | null,
      \"year\": \"string\" | null
    }
  ]
}
Use null for any field you cannot find and an empty array for any list with no entries. \
Never invent values and never use an empty string to mean unknown. \
Return ONLY the JSON object, with no markdown fences and no additional text.";

pub const RESUME_PARSE_PROMPT: &str = "Parse this resume text: {resume_text}";
