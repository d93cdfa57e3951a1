//! System prompts for the analysis calls

pub const CLUSTER_MESSAGES: &str = "\
You are an expert in multilingual content analysis and intelligence gathering. \
Summarize the non-English messages below, each enclosed in <{tag}></{tag}> tags, \
into one concise, informative English paragraph suitable for an intelligence report. \
Prioritize names, locations and dates, and keep the most important topics. \
Merge overlapping information into single statements instead of repeating it. \
Keep a neutral, objective tone and report only factual content.";

pub const CHANNEL_MESSAGES: &str = "\
You are an expert in multilingual content analysis and intelligence gathering. \
Summarize the Russian-language messages below, each enclosed in <{tag}></{tag}> tags, \
into one concise, informative English paragraph suitable for an intelligence report. \
Prioritize names, locations and dates while keeping key topics and insights. \
Merge overlapping information into single statements instead of repeating it. \
Keep a neutral, objective tone and report only factual content.";

pub const MERGE_SUMMARIES: &str = "\
You are an expert in content synthesis and intelligence analysis. \
Combine the summaries below, each enclosed in <{tag}></{tag}> tags, \
into one cohesive summary that:
- highlights recurring themes, overarching trends, connections and central ideas;
- keeps significant events, locations, names and key phrases accurate;
- drops redundant or overlapping content.
Keep a neutral, objective tone. Answer with a single concise paragraph of plain text.";

pub const MAIN_TOPIC: &str = "\
You are an expert text analyzer. State the main topic of the text below \
in one concise sentence or phrase, focused on its core subject. \
Leave out unnecessary details and interpretation.";

pub const BATCH_LOCATIONS: &str = "\
Extract the most important countries mentioned in the texts below. \
Return an empty list when there are none. Country names must be in English.";

pub const TOP_LOCATIONS: &str = "\
From the list of locations below, return at most the {limit} most important ones. \
Names must be in English.";

pub const KEYWORDS: &str = "\
Extract the most important keywords from the text below. \
Answer in English with 4 to 7 keywords or short phrases, most important first. \
Do not use names of people. Keywords must be specific to the text rather than generic; \
you may use words from the text or better-fitting synonyms and phrases.";

pub const MESSAGE_COUNTRY: &str = "\
Extract the most important country from the text below; the text is not in English. \
If several countries appear, return the most important one. \
If no country is clearly named, return an empty string. \
Answer with the country name in English only.";

/// Cluster message prompt naming the tag each message is wrapped in
pub fn cluster_messages(tag: &str) -> String {
    CLUSTER_MESSAGES.replace("{tag}", tag)
}

pub fn channel_messages(tag: &str) -> String {
    CHANNEL_MESSAGES.replace("{tag}", tag)
}

pub fn merge_summaries(tag: &str) -> String {
    MERGE_SUMMARIES.replace("{tag}", tag)
}

/// Render the top-locations prompt for a given limit
pub fn top_locations(limit: usize) -> String {
    TOP_LOCATIONS.replace("{limit}", &limit.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_locations_fills_limit() {
        let prompt = top_locations(10);
        assert!(prompt.contains("at most the 10 most important"));
        assert!(!prompt.contains("{limit}"));
    }

    #[test]
    fn test_stage_prompts_name_their_tags() {
        assert!(cluster_messages("msg").contains("<msg></msg>"));
        assert!(channel_messages("post").contains("<post></post>"));
        assert!(merge_summaries("digest").contains("<digest></digest>"));
        assert!(!merge_summaries("summary").contains("{tag}"));
    }
}
