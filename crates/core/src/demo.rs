// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random task descriptions for demo workers

use rand::seq::SliceRandom;
use rand::Rng;

const VERBS: &[&str] = &["debug", "refactor", "optimize", "deploy", "code", "reboot"];

const ADJECTIVES: &[&str] = &[
    "brilliant",
    "radiant",
    "magnificent",
    "benevolent",
    "gracious",
    "joyful",
    "resilient",
    "harmonious",
    "admirable",
    "charismatic",
];

const NOUNS: &[&str] = &[
    "algorithm",
    "bandwidth",
    "cache",
    "database",
    "firewall",
    "keyboard",
    "motherboard",
    "processor",
    "software",
    "automated agent",
];

/// `"<verb> the <adjective> <noun>"`, e.g. "debug the brilliant cache"
pub fn task_description(rng: &mut impl Rng) -> String {
    let verb = pick(VERBS, rng);
    let adjective = pick(ADJECTIVES, rng);
    let noun = pick(NOUNS, rng);
    format!("{} the {} {}", verb, adjective, noun)
}

fn pick(words: &[&'static str], rng: &mut impl Rng) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}
