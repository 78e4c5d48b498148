//! Local responder used for chat replies. Picks an upbeat canned answer by
//! keyword; completion backends are wired in elsewhere.

use rand::seq::IndexedRandom;

const CRISIS_REPLY: &str = "If you're in immediate danger, please call 988 \
     (Suicide & Crisis Lifeline) or 911, or text HOME to 741741 for 24/7 crisis support. \
     Your life matters, and there are people ready to help you right now. 💙";

const SAD_REPLIES: &[&str] = &[
    "Why don't scientists trust atoms? They make up everything! 😄 I know things feel heavy \
     right now, but even the longest night ends with a sunrise. 🌅",
    "What do you call a fake noodle? An impasta! 🍝 Tough days don't last, and you're \
     stronger than you think. 💪",
];

const CHEER_REPLIES: &[&str] = &[
    "A group of bunnies is called a fluffle. 🐰 That alone deserves a smile! You're doing \
     something good just by looking after your happiness. ✨",
    "Why don't eggs tell jokes? They'd crack each other up! 🥚 Think of one small thing that \
     went right today. It counts! 🌟",
];

const ANXIOUS_REPLY: &str = "Why did the coffee file a police report? It got mugged! ☕ \
     Anxiety can feel huge, but you've made it through every hard day so far. Breathe in... \
     and out. You've got this. 🌈";

const TIRED_REPLY: &str = "Why did the bicycle fall over? It was two-tired! 🚲 Even superheroes \
     need rest. It's okay to take a break; tomorrow is a fresh start. 🌅";

const GREETINGS: &[&str] = &[
    "Hey there! 🐰 I'm so glad you're here. How can I brighten your day?",
    "Hello! What's on your mind? I'm all ears, floppy ones included! 😊",
    "Hi! I'm Rabbit. What would you like to talk about today? 😄",
];

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn pick(options: &'static [&'static str]) -> &'static str {
    options.choose(&mut rand::rng()).copied().unwrap_or(GREETINGS[0])
}

/// Reply to one user message.
pub fn respond(message: &str) -> &'static str {
    let text = message.to_lowercase();

    // Danger words win over every other topic; a bare "help" comes last.
    if mentions(&text, &["crisis", "suicide", "kill myself"]) {
        CRISIS_REPLY
    } else if mentions(&text, &["sad", "depressed", "down", "unhappy"]) {
        pick(SAD_REPLIES)
    } else if mentions(&text, &["make me happy", "cheer me up", "make me feel better"]) {
        pick(CHEER_REPLIES)
    } else if mentions(&text, &["anxious", "anxiety", "worried", "stressed"]) {
        ANXIOUS_REPLY
    } else if mentions(&text, &["tired", "exhausted", "worn out"]) {
        TIRED_REPLY
    } else if mentions(&text, &["help"]) {
        CRISIS_REPLY
    } else {
        pick(GREETINGS)
    }
}
