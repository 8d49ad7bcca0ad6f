//! 工具调用门禁
//!
//! 每轮对话开始时对用户消息做词法预筛（casefold + 分词，对照动作词表），
//! 得到本轮是否授权工具调用的 GateDecision；与之独立的 PolicyInstructions
//! 作为常驻系统提示约束模型本身。两层互为冗余：预筛失配时由策略层兜底，
//! 预筛判否时循环侧硬性拒绝执行工具（见 react::loop_）。

/// 每轮一次的门禁判定；在本轮编排期间不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    /// 本轮是否授权工具调用
    pub actions_authorized: bool,
    /// 触发授权的词（未授权时为 None）
    pub matched: Option<String>,
}

impl GateDecision {
    /// 未授权（纯对话轮）
    pub fn conversation_only() -> Self {
        Self {
            actions_authorized: false,
            matched: None,
        }
    }
}

/// 动作动词与产物名词（法语 + 英语；含去重音变体）。
/// 任一词以完整 token 出现即授权本轮工具调用。
const ACTION_TERMS: &[&str] = &[
    // 动词：生成 / 创建 / 撰写 / 导出 / 发送
    "génère", "génères", "générer", "genere", "generes", "generer",
    "crée", "crées", "créer", "cree", "crees", "creer",
    "rédige", "rédiges", "rédiger", "redige", "rediges", "rediger",
    "exporte", "exportes", "exporter",
    "envoie", "envoies", "envoyer",
    "construis", "construire",
    "produis", "produire",
    "fabrique", "fabriquer",
    "generate", "generates", "create", "creates", "build", "builds",
    "export", "exports", "send", "sends", "write",
    // 名词：支持的产物类型
    "pdf", "excel", "xlsx", "word", "docx",
    "document", "documents",
    "rapport", "rapports", "report", "reports",
    "lettre", "lettres", "letter", "letters",
    "tableur", "spreadsheet", "classeur",
    "mail", "email", "courriel",
];

/// 词法预筛：casefold 后按非字母数字切分，逐 token 对照词表。
/// 完整 token 比较而非子串，避免 "comment" 误中 "mail" 一类情况；
/// 连字符按分隔符处理，"envoie-moi" 切出 "envoie"、"e-mail" 切出 "mail"。
/// 含澄清疑问与动作动词并存的消息仍判授权（歧义交给策略层处理）。
pub fn classify(message: &str) -> GateDecision {
    let lowered = message.to_lowercase();
    for token in lowered.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        if ACTION_TERMS.contains(&token) {
            return GateDecision {
                actions_authorized: true,
                matched: Some(token.to_string()),
            };
        }
    }
    GateDecision::conversation_only()
}

/// 传给编排器的声明式策略指令：常驻策略 + 受限模式追加指令。
/// 与词法预筛相互独立，可分别单测。
#[derive(Debug, Clone)]
pub struct PolicyInstructions {
    /// 常驻系统提示：禁止自主调用工具，歧义时先澄清
    pub standing: &'static str,
    /// 受限模式（预筛判否）追加的纯文本指令
    pub restricted: &'static str,
}

impl Default for PolicyInstructions {
    fn default() -> Self {
        Self {
            standing: STANDING_POLICY,
            restricted: RESTRICTED_POLICY,
        }
    }
}

const STANDING_POLICY: &str = "You are Plume, a conversational office assistant. \
You can draft Word letters, PDF reports and Excel workbooks, and send transactional emails, \
but ONLY when the user's request contains an explicit action verb (generate, create, export, send, \
génère, crée, rédige, exporte, envoie...). Never call a tool on your own initiative. \
If the user's intent is ambiguous, ask a clarifying question in plain text instead of calling a tool.";

const RESTRICTED_POLICY: &str = "Tools are disabled for this turn. \
Answer in plain text only, whatever the message may suggest. Do not output a tool call.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_conversation_not_authorized() {
        let d = classify("Bonjour, comment vas-tu ?");
        assert!(!d.actions_authorized);
        assert!(d.matched.is_none());
    }

    #[test]
    fn test_action_verb_authorizes() {
        let d = classify("Génère un PDF nommé rapport avec le titre X");
        assert!(d.actions_authorized);
        assert!(d.matched.is_some());
    }

    #[test]
    fn test_artifact_noun_authorizes() {
        assert!(classify("il me faudrait un tableur des ventes").actions_authorized);
        assert!(classify("can you send an email to bob@example.com").actions_authorized);
    }

    #[test]
    fn test_case_folding() {
        assert!(classify("CRÉE un document").actions_authorized);
        assert!(classify("EXPORT the data please").actions_authorized);
    }

    // "comment" 含 "mail" 之外的子串也不得误中：必须整 token 匹配
    #[test]
    fn test_no_substring_match() {
        assert!(!classify("comment faire des merveilles ?").actions_authorized);
        assert!(!classify("raconte-moi une histoire de dragons").actions_authorized);
    }

    // 澄清疑问 + 动作动词并存：仍授权，由策略层决定是否先澄清
    #[test]
    fn test_question_with_verb_still_authorized() {
        let d = classify("Peux-tu créer quelque chose ? Je ne sais pas trop quoi...");
        assert!(d.actions_authorized);
    }

    #[test]
    fn test_hyphenated_email_variant() {
        assert!(classify("envoie un e-mail à l'équipe").actions_authorized);
    }
}
