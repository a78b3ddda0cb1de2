use reqwest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{env, fmt, time::Duration};

use crate::models::trip::GenerateItineraryRequest;

const SONAR_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
const SONAR_MODEL: &str = "llama-3.1-sonar-small-128k-online";
const SAMPLING_TEMPERATURE: f32 = 0.7;
const MAX_COMPLETION_TOKENS: u32 = 4000;

const SYSTEM_PROMPT: &str =
    "You are a travel expert specializing in Indian destinations. Always respond with valid JSON format.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug)]
pub enum SonarError {
    EnvironmentError(String),
    Unavailable(String),
    ParseError(String),
}

impl fmt::Display for SonarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SonarError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            SonarError::Unavailable(msg) => {
                write!(f, "AI service temporarily unavailable: {}", msg)
            }
            SonarError::ParseError(msg) => write!(f, "Failed to parse AI response: {}", msg),
        }
    }
}

impl std::error::Error for SonarError {}

/// Chat-completions client for the Sonar text-generation API. The reply must
/// carry a JSON object somewhere in its text; everything around it is
/// ignored.
pub struct SonarService {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SonarService {
    pub fn new() -> Result<Self, SonarError> {
        let api_key = env::var("SONAR_API_KEY")
            .map_err(|_| SonarError::EnvironmentError("SONAR_API_KEY not set".to_string()))?;

        Ok(Self::with_base_url(api_key, SONAR_ENDPOINT.to_string()))
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        // The completion call is the slow leg of the pipeline; give it a
        // generous ceiling compared to the enrichers.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Send the prompt and return the parsed JSON object embedded in the
    /// reply text.
    pub async fn synthesize(&self, prompt: &str) -> Result<Value, SonarError> {
        let request = ChatRequest {
            model: SONAR_MODEL.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: SAMPLING_TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| SonarError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("Sonar API error ({}): {}", status, body);
            return Err(SonarError::Unavailable(format!(
                "completion request failed with status {}",
                status
            )));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|err| SonarError::ParseError(err.to_string()))?;

        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                SonarError::ParseError("no content in completion response".to_string())
            })?;

        let json_text = extract_json_object(&content).ok_or_else(|| {
            SonarError::ParseError("no JSON object in completion output".to_string())
        })?;

        serde_json::from_str(json_text).map_err(|err| SonarError::ParseError(err.to_string()))
    }
}

/// Locate the first balanced `{...}` object in the reply text. The scan is
/// string-aware so braces inside JSON string values do not throw off the
/// depth count.
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Build the synthesis instruction for one trip. Hotel-related guidance is
/// present only when the trip actually carries lodging details, so an
/// itinerary without a hotel never asks for hotel distances.
pub fn build_prompt(
    request: &GenerateItineraryRequest,
    weather_context: &str,
    travel_context: &str,
) -> String {
    let hotel_info = match (
        request.hotel_name.as_deref(),
        request.hotel_address.as_deref(),
    ) {
        (Some(name), Some(address)) if !name.is_empty() && !address.is_empty() => format!(
            "User is staying at {} located at {}. Recommend activities and attractions near this hotel and optimize travel times from this location. {}",
            name, address, travel_context
        ),
        _ => String::new(),
    };

    let arrival = request.arrival_time.as_deref().unwrap_or("flexible");
    let departure = request.departure_time.as_deref().unwrap_or("flexible");
    let people = request.number_of_people;

    let mut guidance: Vec<String> = Vec::new();
    if !hotel_info.is_empty() {
        guidance.push("- Distance from hotel".to_string());
        guidance.push("- Estimated travel time from hotel".to_string());
    }
    guidance.push("- Best time to visit considering traffic".to_string());
    guidance.push(
        "- Popular attractions with descriptions (focus on Indian culture if destination is in India)"
            .to_string(),
    );
    guidance.push("- Hidden gems and seasonal recommendations".to_string());
    guidance.push(format!(
        "- Local food recommendations with price ranges (Budget/Mid/High) and costs for {} people",
        people
    ));
    guidance.push("- Suggested visit times for each attraction".to_string());
    guidance.push("- Travel tips specific to the destination".to_string());
    guidance.push("- Weather-appropriate activity suggestions".to_string());
    guidance.push(format!(
        "- Cost calculations for the entire group of {} people",
        people
    ));

    format!(
        r#"Create a detailed day-by-day itinerary for {people} people visiting {destination}, from {start} to {end}, arrival time {arrival}, departure time {departure}, budget ₹{budget}, trip vibe: {vibe}.

{hotel_info}
{weather_context}

IMPORTANT: Calculate all costs for {people} people. Include both per-person and total group costs.

Include for each attraction:
{guidance}

Format the response as JSON with this structure:
{{
  "days": [
    {{
      "day": 1,
      "date": "YYYY-MM-DD",
      "activities": [
        {{
          "time": "09:00",
          "title": "Activity name",
          "description": "Detailed description",
          "duration": "2 hours",
          "cost_estimate": 500
        }}
      ],
      "attractions": [
        {{
          "name": "Attraction name",
          "description": "Description",
          "visit_time": "Best time to visit",
          "entrance_fee": 200,
          "distance_from_hotel": "2.5 km",
          "travel_time_from_hotel": "15 minutes",
          "recommended_duration": "2 hours"
        }}
      ],
      "food_recommendations": [
        {{
          "name": "Restaurant/dish name",
          "cuisine": "Type of cuisine",
          "price_range": "Budget/Mid/High",
          "cost_per_person": 300,
          "total_cost_for_group": {food_group_cost},
          "description": "What makes it special"
        }}
      ],
      "estimated_day_cost": 2000,
      "estimated_day_cost_for_group": {day_group_cost}
    }}
  ],
  "travel_tips": ["tip1", "tip2"],
  "total_cost_per_person": 15000,
  "total_cost_for_group": {trip_group_cost},
  "cost_breakdown": {{
    "accommodation_per_night": 3000,
    "food_per_person_per_day": 1000,
    "attractions_per_person": 500,
    "transport_per_person": 800
  }}
}}"#,
        people = people,
        destination = request.destination,
        start = request.start_date,
        end = request.end_date,
        arrival = arrival,
        departure = departure,
        budget = request.budget,
        vibe = request.trip_vibe.as_str(),
        hotel_info = hotel_info,
        weather_context = weather_context,
        guidance = guidance.join("\n"),
        food_group_cost = people * 300,
        day_group_cost = people * 2000,
        trip_group_cost = people * 15000,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::TripVibe;
    use chrono::NaiveDate;
    use serde_json::json;

    fn goa_request(hotel: bool) -> GenerateItineraryRequest {
        GenerateItineraryRequest {
            trip_id: "652f1c7b8e4d2a0001a1b2c3".to_string(),
            destination: "Goa".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 12).unwrap(),
            arrival_time: Some("10:00".to_string()),
            departure_time: Some("18:00".to_string()),
            budget: 40000.0,
            trip_vibe: TripVibe::Relax,
            hotel_name: hotel.then(|| "Taj Holiday Village".to_string()),
            hotel_address: hotel.then(|| "Candolim, Goa".to_string()),
            number_of_people: 2,
        }
    }

    #[test]
    fn extracts_json_surrounded_by_prose() {
        let reply = "Here is your itinerary:\n{\"days\": [{\"day\": 1}]}\nEnjoy your trip!";
        assert_eq!(extract_json_object(reply), Some("{\"days\": [{\"day\": 1}]}"));
    }

    #[test]
    fn extraction_handles_braces_inside_strings() {
        let reply = r#"prose {"note": "use {curly} braces", "n": 1} trailing"#;
        let extracted = extract_json_object(reply).unwrap();
        let value: serde_json::Value = serde_json::from_str(extracted).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn extraction_handles_escaped_quotes() {
        let reply = r#"{"quote": "she said \"go\" {now}"} extra"#;
        let extracted = extract_json_object(reply).unwrap();
        assert!(extracted.ends_with("{now}\"}"));
    }

    #[test]
    fn no_object_yields_none() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("unbalanced { \"a\": 1"), None);
    }

    #[test]
    fn prompt_without_lodging_omits_hotel_guidance() {
        let prompt = build_prompt(&goa_request(false), "", "");
        assert!(prompt.contains("visiting Goa"));
        assert!(prompt.contains("2 people"));
        assert!(!prompt.contains("Distance from hotel"));
        assert!(!prompt.contains("staying at"));
    }

    #[test]
    fn prompt_with_lodging_carries_hotel_and_travel_context() {
        let prompt = build_prompt(
            &goa_request(true),
            "Weather forecast: 2026-08-10: 31°C, Rain",
            "Travel times from hotel: Fort Aguada: 15 mins (2.5 km)",
        );
        assert!(prompt.contains("staying at Taj Holiday Village"));
        assert!(prompt.contains("- Distance from hotel"));
        assert!(prompt.contains("Travel times from hotel: Fort Aguada"));
        assert!(prompt.contains("Weather forecast: 2026-08-10"));
    }

    #[test]
    fn prompt_is_constructible_with_empty_enrichment() {
        let prompt = build_prompt(&goa_request(true), "", "");
        assert!(prompt.contains("trip vibe: Relax"));
        assert!(prompt.contains("budget ₹40000"));
        assert!(prompt.contains("Format the response as JSON"));
    }

    #[tokio::test]
    async fn synthesize_parses_prose_wrapped_reply() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Sure! {\"days\": [{\"day\": 1}]} Have fun." } }
            ]
        });
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let service = SonarService::with_base_url("test-key".to_string(), server.url());
        let value = service.synthesize("prompt").await.unwrap();
        assert_eq!(value["days"][0]["day"], 1);
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let service = SonarService::with_base_url("test-key".to_string(), server.url());
        match service.synthesize("prompt").await {
            Err(SonarError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn reply_without_json_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "I could not produce an itinerary." } }
            ]
        });
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let service = SonarService::with_base_url("test-key".to_string(), server.url());
        match service.synthesize("prompt").await {
            Err(SonarError::ParseError(_)) => {}
            other => panic!("expected ParseError, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn missing_choice_content_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(json!({ "choices": [] }).to_string())
            .create_async()
            .await;

        let service = SonarService::with_base_url("test-key".to_string(), server.url());
        assert!(matches!(
            service.synthesize("prompt").await,
            Err(SonarError::ParseError(_))
        ));
    }
}
