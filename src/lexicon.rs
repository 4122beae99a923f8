//! Word lists behind the detection and rewrite heuristics.
//!
//! Everything here is data. Adding a verb form, a preferred term, or a
//! wordy phrase should never require touching control flow.

/// Forms of "to be" that introduce a passive construction.
pub const BE_FORMS: &[&str] = &["am", "is", "are", "was", "were", "be", "been", "being"];

pub const MODALS: &[&str] = &[
    "must", "can", "could", "should", "will", "would", "may", "might", "shall",
];

/// Finite verbs and auxiliaries that make a clause complete on their own.
pub const FINITE_MARKERS: &[&str] = &[
    "am", "is", "are", "was", "were", "has", "have", "had", "do", "does", "did", "must", "can",
    "could", "should", "will", "would", "may", "might", "shall", "need", "needs",
];

pub const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "your", "its", "their", "our", "my",
    "his", "her", "each", "every", "all", "any", "some", "one", "two", "three", "both",
];

pub const SUBJECT_PRONOUNS: &[&str] = &["i", "you", "he", "she", "it", "we", "they", "there"];

pub const RELATIVE_MARKERS: &[&str] = &["which", "that", "who", "whom", "whose", "where"];

pub const PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "for", "from", "to", "with", "by", "of", "into", "onto", "over", "under",
    "during", "before", "after", "via", "through", "using", "within", "without", "between",
];

/// Words that signal an imperative sentence when they open it.
pub const IMPERATIVE_VERBS: &[&str] = &[
    "click", "select", "open", "enter", "install", "configure", "go", "make", "ensure", "check",
    "use", "run", "navigate", "press", "choose", "type", "add", "remove", "download", "connect",
    "follow", "note", "see", "log", "set", "verify", "create", "restart", "copy", "save",
    "start", "stop", "close", "deploy", "upload", "drag", "wait", "repeat", "confirm", "do",
];

/// Verbs whose base form keeps a final "e" that "-ed" swallowed.
pub const E_FINAL_VERBS: &[&str] = &[
    "configure", "create", "use", "update", "require", "define", "store", "save", "replace",
    "provide", "manage", "enable", "disable", "execute", "generate", "remove", "delete", "close",
    "change", "name", "release", "validate", "receive", "compile", "locate", "type", "move",
    "archive", "schedule", "share", "complete", "activate", "deactivate", "operate", "initiate",
    "measure", "capture", "secure", "promote", "review", "analyze", "organize", "describe",
    "automate", "translate", "exclude", "include", "approve", "prepare", "issue", "continue",
    "produce", "reduce", "introduce", "restore", "ignore", "combine", "determine", "examine",
    "notice", "note", "place", "serve",
];

/// Irregular verbs: (participle, simple past, base).
pub const IRREGULAR_VERBS: &[(&str, &str, &str)] = &[
    ("written", "wrote", "write"),
    ("given", "gave", "give"),
    ("made", "made", "make"),
    ("done", "did", "do"),
    ("shown", "showed", "show"),
    ("taken", "took", "take"),
    ("sent", "sent", "send"),
    ("built", "built", "build"),
    ("found", "found", "find"),
    ("run", "ran", "run"),
    ("set", "set", "set"),
    ("put", "put", "put"),
    ("read", "read", "read"),
    ("known", "knew", "know"),
    ("seen", "saw", "see"),
    ("chosen", "chose", "choose"),
    ("held", "held", "hold"),
    ("kept", "kept", "keep"),
    ("left", "left", "leave"),
    ("paid", "paid", "pay"),
    ("told", "told", "tell"),
    ("thought", "thought", "think"),
    ("brought", "brought", "bring"),
    ("bought", "bought", "buy"),
    ("caught", "caught", "catch"),
    ("taught", "taught", "teach"),
    ("sold", "sold", "sell"),
    ("driven", "drove", "drive"),
    ("begun", "began", "begin"),
    ("broken", "broke", "break"),
    ("drawn", "drew", "draw"),
    ("forgotten", "forgot", "forget"),
    ("hidden", "hid", "hide"),
    ("lost", "lost", "lose"),
    ("meant", "meant", "mean"),
    ("spent", "spent", "spend"),
    ("understood", "understood", "understand"),
    ("won", "won", "win"),
    ("output", "output", "output"),
];

/// Participles that read as adjectives after "to be" and are not flagged.
pub const ADJECTIVAL_PARTICIPLES: &[&str] = &[
    "interested", "tired", "excited", "pleased", "concerned", "supposed", "used", "advanced",
    "experienced", "detailed", "limited", "qualified", "complicated", "sophisticated",
];

/// Intensifiers and filler adverbs that weaken prose.
pub const WEAK_ADVERBS: &[&str] = &[
    "very", "really", "basically", "actually", "quite", "extremely", "totally", "completely",
    "literally", "definitely", "fairly", "rather", "somewhat", "truly", "simply", "essentially",
];

/// Adverbs whose meaning depends on where they sit.
pub const POSITION_SENSITIVE_ADVERBS: &[&str] = &["only", "just"];

/// Words that never start the verb phrase an adverb like "only" modifies.
pub const NON_VERB_WORDS: &[&str] = &[
    "the", "a", "an", "one", "when", "if", "after", "before", "for", "in", "on", "at", "to",
    "with", "by", "once", "because", "a few", "available", "this", "that", "these", "those",
    "some", "few", "then", "now", "as", "like", "about",
];

pub const VAGUE_TERMS: &[&str] = &[
    "various", "several", "a number of", "a lot of", "lots of", "some", "stuff", "things",
    "etc.", "and so on", "appropriate", "relevant", "certain", "kind of", "sort of", "many",
];

/// Wordy phrases and their concise replacements. An empty replacement
/// deletes the phrase.
pub const WORDY_PHRASES: &[(&str, &str)] = &[
    ("in order to", "to"),
    ("please note that", ""),
    ("it is important to note that", ""),
    ("it should be noted that", ""),
    ("due to the fact that", "because"),
    ("at this point in time", "now"),
    ("is able to", "can"),
    ("are able to", "can"),
    ("make use of", "use"),
    ("in the event that", "if"),
    ("prior to", "before"),
    ("a large number of", "many"),
    ("for the purpose of", "for"),
    ("with regard to", "about"),
];

/// Vague phrases with a concrete-enough replacement.
pub const VAGUE_REPLACEMENTS: &[(&str, &str)] = &[
    ("a lot of", "many"),
    ("lots of", "many"),
    ("kind of", ""),
    ("sort of", ""),
];

/// Non-preferred term and its house-style replacement.
pub const PREFERRED_TERMS: &[(&str, &str)] = &[
    ("e-mail", "email"),
    ("web site", "website"),
    ("check box", "checkbox"),
    ("plug-in", "plugin"),
    ("datacenter", "data center"),
    ("back-end", "backend"),
    ("front-end", "frontend"),
    ("on-premise", "on-premises"),
    ("whitelist", "allowlist"),
    ("blacklist", "denylist"),
];

/// Spelling variants of one term: (canonical, variants including canonical).
pub const VARIANT_GROUPS: &[(&str, &[&str])] = &[
    ("email", &["email", "e-mail"]),
    ("setup", &["setup", "set-up"]),
    ("login", &["login", "log-in"]),
    ("dataset", &["dataset", "data set"]),
    ("filename", &["filename", "file name"]),
    ("username", &["username", "user name"]),
];

/// Words whose "u"/"o" start takes "a", or whose silent "h" takes "an".
pub const ARTICLE_EXCEPTIONS_A: &[&str] = &[
    "user", "users", "unit", "units", "unique", "universal", "usual", "usage", "use", "useful",
    "one", "once", "euro", "uniform", "union", "utility", "uri", "url",
];
pub const ARTICLE_EXCEPTIONS_AN: &[&str] = &["hour", "hours", "honest", "honor", "honour", "heir"];

/// Phrases in style-guide text that mark which issue a chunk discusses.
pub const ISSUE_TAG_CUES: &[(&str, &str)] = &[
    ("passive", "passive-voice"),
    ("active voice", "passive-voice"),
    ("sentence length", "long-sentence"),
    ("long sentence", "long-sentence"),
    ("short sentence", "long-sentence"),
    ("adverb", "adverb"),
    ("vague", "vague-term"),
    ("precise", "vague-term"),
    ("terminolog", "terminology"),
    ("glossary", "terminology"),
    ("consisten", "consistency"),
    ("grammar", "grammar"),
    ("article", "grammar"),
    ("wordy", "style"),
    ("concise", "style"),
    ("style", "style"),
];

pub fn is_one_of(word: &str, list: &[&str]) -> bool {
    let lower = word.to_lowercase();
    list.contains(&lower.as_str())
}

/// Base-form verbs that commonly open an infinitive purpose clause
/// ("... to reduce disk usage").
pub const PURPOSE_VERBS: &[&str] = &[
    "access", "allow", "apply", "avoid", "change", "control", "display", "edit", "export",
    "find", "get", "help", "import", "improve", "keep", "load", "modify", "monitor", "prevent",
    "protect", "read", "receive", "reduce", "send", "show", "support", "test", "track",
    "transfer", "view", "write", "manage", "update", "define", "store", "ensure",
];

/// Words after which "to" does not start a purpose clause.
pub const INFINITIVE_GOVERNORS: &[&str] = &[
    "how", "what", "where", "when", "whether", "which", "need", "needs", "needed", "have", "has",
    "had", "able", "want", "wants", "wanted", "order", "used", "going", "like", "likes",
    "required", "allowed", "try", "tries", "tried", "is", "are", "was", "were", "be", "due",
    "according", "up", "prior", "next", "close", "compared", "similar", "relative", "ought",
    "plan", "plans", "intend", "intends", "designed", "expected", "likely", "unable",
];

/// Words that open a dependent clause and cannot stand as a sentence.
pub const SUBORDINATORS: &[&str] = &[
    "when", "if", "after", "before", "because", "although", "though", "while", "since", "once",
    "as", "unless", "until", "whether", "whereas",
];

/// Object forms of subject pronouns, and the reverse for "by" agents.
pub const PRONOUN_CASES: &[(&str, &str)] = &[
    ("i", "me"),
    ("we", "us"),
    ("he", "him"),
    ("she", "her"),
    ("they", "them"),
    ("it", "it"),
    ("you", "you"),
];
