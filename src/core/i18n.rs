//! Built-in translations keyed by the English phrase.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    SimplifiedChinese,
    TraditionalChinese,
    Japanese,
}

impl Language {
    /// Accepts `zh_CN`, `zh-TW`, `ja_JP.UTF-8` and similar locale strings.
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim();
        let base = code.split(['.', '@']).next().unwrap_or(code).replace('-', "_");
        match base.as_str() {
            "" | "C" | "POSIX" => None,
            "zh_CN" | "zh_SG" | "zh_Hans" | "zh" => Some(Language::SimplifiedChinese),
            "zh_TW" | "zh_HK" | "zh_Hant" => Some(Language::TraditionalChinese),
            other if other.starts_with("ja") => Some(Language::Japanese),
            other if other.starts_with("en") => Some(Language::English),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::SimplifiedChinese => "zh_CN",
            Language::TraditionalChinese => "zh_TW",
            Language::Japanese => "ja",
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::English => &[],
            Language::SimplifiedChinese => ZH_CN,
            Language::TraditionalChinese => ZH_TW,
            Language::Japanese => JA,
        }
    }
}

/// Translates UI strings for one language; unknown keys come back as-is.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    language: Language,
}

impl Translator {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Configured language first, then `CARDCHAT_LANG`, `LC_ALL` and `LANG`.
    pub fn detect(configured: Option<&str>) -> Self {
        Self::detect_with(configured, |key| std::env::var(key).ok())
    }

    pub fn detect_with(configured: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let language = configured
            .and_then(Language::from_code)
            .or_else(|| {
                ["CARDCHAT_LANG", "LC_ALL", "LANG"]
                    .into_iter()
                    .filter_map(&lookup)
                    .find_map(|value| Language::from_code(&value))
            })
            .unwrap_or_default();
        debug!(language = language.code(), "selected UI language");
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn translate(&self, key: &str) -> String {
        self.language
            .table()
            .iter()
            .find(|(english, _)| *english == key)
            .map(|(_, translated)| translated.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

const ZH_CN: &[(&str, &str)] = &[
    ("Chat with AI", "与AI聊天"),
    ("Type your message...", "输入您的消息..."),
    ("Send", "发送"),
    ("Thinking...", "思考中..."),
    ("AI is thinking...", "AI正在思考..."),
    ("Clear Chat", "清空聊天"),
    ("Save to Card", "保存到卡片"),
    ("Save", "保存"),
    ("Failed to Save to Card", "保存到卡片失败"),
    ("Conversation saved to card successfully", "对话已成功保存到卡片"),
    ("Close", "关闭"),
    ("Settings", "设置"),
    ("Language", "语言"),
    ("API Key", "API密钥"),
    ("Model", "模型"),
    ("Cancel", "取消"),
    ("Error", "错误"),
    ("Warning", "警告"),
    ("Information", "信息"),
    ("No new conversation to save", "没有新的对话需要保存"),
    ("Please enter a message", "请输入消息"),
    ("Test Connection", "测试连接"),
];

const ZH_TW: &[(&str, &str)] = &[
    ("Chat with AI", "與AI聊天"),
    ("Type your message...", "輸入您的訊息..."),
    ("Send", "傳送"),
    ("Thinking...", "思考中..."),
    ("AI is thinking...", "AI正在思考..."),
    ("Clear Chat", "清空聊天"),
    ("Save to Card", "儲存到卡片"),
    ("Save", "儲存"),
    ("Failed to Save to Card", "儲存到卡片失敗"),
    ("Conversation saved to card successfully", "對話已成功儲存到卡片"),
    ("Close", "關閉"),
    ("Settings", "設定"),
    ("Language", "語言"),
    ("API Key", "API密鑰"),
    ("Model", "模型"),
    ("Cancel", "取消"),
    ("Error", "錯誤"),
    ("Warning", "警告"),
    ("Information", "資訊"),
    ("No new conversation to save", "沒有新的對話需要儲存"),
    ("Please enter a message", "請輸入訊息"),
    ("Test Connection", "測試連線"),
];

const JA: &[(&str, &str)] = &[
    ("Chat with AI", "AIとチャット"),
    ("Type your message...", "メッセージを入力してください..."),
    ("Send", "送信"),
    ("Thinking...", "考え中..."),
    ("AI is thinking...", "AIが考えています..."),
    ("Clear Chat", "チャットをクリア"),
    ("Save to Card", "カードに保存"),
    ("Save", "保存"),
    ("Failed to Save to Card", "カードへの保存に失敗しました"),
    ("Conversation saved to card successfully", "会話がカードに正常に保存されました"),
    ("Close", "閉じる"),
    ("Settings", "設定"),
    ("Language", "言語"),
    ("API Key", "APIキー"),
    ("Model", "モデル"),
    ("Cancel", "キャンセル"),
    ("Error", "エラー"),
    ("Warning", "警告"),
    ("Information", "情報"),
    ("No new conversation to save", "保存する新しい会話がありません"),
    ("Please enter a message", "メッセージを入力してください"),
    ("Test Connection", "接続テスト"),
];
