//! Bilingual message catalog
//!
//! Every user-facing string lives here, keyed by [`Msg`] and [`Language`].
//! Templates use `{name}` placeholders filled by [`render`] (HTML message
//! bodies, values escaped) or [`label`] (button captions, values verbatim).

use crate::bot::events::{AnalysisKind, CompareKind};
use crate::session::Language;

macro_rules! catalog {
    ($($key:ident => { en: $en:expr, vi: $vi:expr $(,)? }),* $(,)?) => {
        /// Catalog key
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Msg {
            $($key),*
        }

        impl Msg {
            /// Every key, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$key),*];

            /// Raw template for `language`
            #[must_use]
            pub const fn text(self, language: Language) -> &'static str {
                match (self, language) {
                    $(
                        (Self::$key, Language::English) => $en,
                        (Self::$key, Language::Vietnamese) => $vi,
                    )*
                }
            }
        }
    };
}

catalog! {
    Welcome => {
        en: "👋 Hi {name}! I'm your PDF Analysis Assistant.\n\nI can help you analyze PDF documents using Google's Gemini AI.\n\n🔍 <b>What I can do:</b>\n• Analyze PDF documents\n• Extract key information\n• Answer questions about your documents\n• Compare multiple documents\n\nLet's get started!",
        vi: "👋 Chào {name}! Tôi là Trợ lý Phân tích PDF của bạn.\n\nTôi có thể giúp bạn phân tích tài liệu PDF bằng AI Gemini của Google.\n\n🔍 <b>Tôi có thể làm gì:</b>\n• Phân tích tài liệu PDF\n• Trích xuất thông tin quan trọng\n• Trả lời câu hỏi về tài liệu của bạn\n• So sánh nhiều tài liệu\n\nHãy bắt đầu!",
    },
    Help => {
        en: "📚 <b>PDF Analysis Bot Help</b>\n\n<b>Basic Commands:</b>\n/start - Start the bot and show main menu\n/menu - Show the main menu\n/help - Show this help message\n/language - Change language\n/cancel - Cancel current operation\n\n<b>How to use this bot:</b>\n1. Upload a PDF document\n2. Select analysis options from the menu\n3. Ask questions about your document\n\n<b>Tips:</b>\n• You can upload multiple documents and compare them\n• For best results, use clear and specific questions\n• Large documents may take longer to analyze",
        vi: "📚 <b>Trợ giúp Bot Phân tích PDF</b>\n\n<b>Lệnh cơ bản:</b>\n/start - Khởi động bot và hiển thị menu chính\n/menu - Hiển thị menu chính\n/help - Hiển thị tin nhắn trợ giúp này\n/language - Thay đổi ngôn ngữ\n/cancel - Hủy thao tác hiện tại\n\n<b>Cách sử dụng bot này:</b>\n1. Tải lên tài liệu PDF\n2. Chọn tùy chọn phân tích từ menu\n3. Đặt câu hỏi về tài liệu của bạn\n\n<b>Mẹo:</b>\n• Bạn có thể tải lên nhiều tài liệu và so sánh chúng\n• Để có kết quả tốt nhất, hãy sử dụng câu hỏi rõ ràng và cụ thể\n• Tài liệu lớn có thể mất nhiều thời gian hơn để phân tích",
    },

    // Main menu
    MenuTitle => { en: "📋 <b>Main Menu</b>", vi: "📋 <b>Menu Chính</b>" },
    CurrentDocument => { en: "✅ Current document: {doc}", vi: "✅ Tài liệu hiện tại: {doc}" },
    NoDocumentSelected => { en: "❗ No document selected", vi: "❗ Chưa chọn tài liệu" },
    ChooseOption => { en: "Choose an option:", vi: "Chọn một tùy chọn:" },
    BtnUpload => { en: "📤 Upload PDF", vi: "📤 Tải lên PDF" },
    BtnDocuments => { en: "📚 My Documents", vi: "📚 Tài liệu của tôi" },
    BtnAnalyze => { en: "📝 Analyze: {doc}", vi: "📝 Phân tích: {doc}" },
    BtnAsk => { en: "❓ Ask Question", vi: "❓ Đặt câu hỏi" },
    BtnCompare => { en: "🔄 Compare Documents", vi: "🔄 So sánh tài liệu" },
    BtnLanguage => { en: "🌐 Language / Ngôn ngữ", vi: "🌐 Ngôn ngữ / Language" },
    BtnBackToMenu => { en: "🔙 Back to Menu", vi: "🔙 Quay lại Menu" },
    BtnBack => { en: "🔙 Back", vi: "🔙 Quay lại" },
    BtnRestart => { en: "🔄 Restart", vi: "🔄 Khởi động lại" },

    // Free text outside a flow
    UseMenu => {
        en: "Please use the menu buttons or commands.\n\nType /help to see available commands.",
        vi: "Vui lòng sử dụng các nút menu hoặc lệnh.\n\nGõ /help để xem các lệnh có sẵn.",
    },
    Cancelled => {
        en: "Operation cancelled. Type /start to begin again.",
        vi: "Đã hủy thao tác. Gõ /start để bắt đầu lại.",
    },
    StaleButton => {
        en: "This button is no longer active.",
        vi: "Nút này không còn hoạt động.",
    },
    AccessDenied => {
        en: "⛔ Access denied. This bot is private.",
        vi: "⛔ Truy cập bị từ chối. Bot này là riêng tư.",
    },

    // Upload
    UploadPrompt => {
        en: "📤 <b>Upload PDF</b>\n\nPlease send me a PDF document to analyze.\nYou can simply attach a PDF file.\n\nType /back to return to the main menu.",
        vi: "📤 <b>Tải lên PDF</b>\n\nVui lòng gửi cho tôi một tài liệu PDF để phân tích.\nBạn có thể đính kèm tệp PDF.\n\nGõ /back để quay lại menu chính.",
    },
    AwaitingUpload => {
        en: "I'm waiting for you to upload a PDF document.\n\nPlease send me a PDF file or type /back to return to the main menu.",
        vi: "Tôi đang đợi bạn tải lên tài liệu PDF.\n\nVui lòng gửi cho tôi một tệp PDF hoặc gõ /back để quay lại menu chính.",
    },
    OnlyPdf => {
        en: "❗ Only PDF documents are supported. Please send a .pdf file.",
        vi: "❗ Chỉ hỗ trợ tài liệu PDF. Vui lòng gửi tệp .pdf.",
    },
    Downloading => {
        en: "⏳ Downloading {doc}...\n\nPlease wait while I process your document.",
        vi: "⏳ Đang tải xuống {doc}...\n\nVui lòng đợi trong khi tôi xử lý tài liệu của bạn.",
    },
    UploadingToAi => {
        en: "⏳ Uploading {doc} to Google AI for analysis...",
        vi: "⏳ Đang tải {doc} lên Google AI để phân tích...",
    },
    UploadSuccess => {
        en: "✅ Successfully uploaded: {doc}\n\nThis is now your selected document. What would you like to do?",
        vi: "✅ Đã tải lên thành công: {doc}\n\nĐây là tài liệu đã chọn của bạn. Bạn muốn làm gì?",
    },
    UploadError => {
        en: "❌ Error processing PDF: {error}\n\nPlease try again.",
        vi: "❌ Lỗi khi xử lý PDF: {error}\n\nVui lòng thử lại.",
    },

    // Language
    LanguagePrompt => {
        en: "🌐 Please select your language / Vui lòng chọn ngôn ngữ:",
        vi: "🌐 Please select your language / Vui lòng chọn ngôn ngữ:",
    },
    LanguageName => { en: "🇬🇧 English", vi: "🇻🇳 Tiếng Việt" },
    BtnLanguageBack => { en: "🔙 Back / Quay lại", vi: "🔙 Back / Quay lại" },
    LanguageSet => { en: "✅ Language set to English", vi: "✅ Đã chọn Tiếng Việt" },

    // Documents
    DocumentsTitle => { en: "📚 <b>Your Documents</b>", vi: "📚 <b>Tài liệu của bạn</b>" },
    BtnSelect => { en: "📄 Select: {doc}", vi: "📄 Chọn: {doc}" },
    BtnSelected => { en: "✅ Selected: {doc}", vi: "✅ Đã chọn: {doc}" },
    BtnDelete => { en: "🗑 Delete: {doc}", vi: "🗑 Xóa: {doc}" },
    DocumentSelected => { en: "✅ Selected document: {doc}", vi: "✅ Đã chọn tài liệu: {doc}" },
    DocumentDeleted => { en: "✅ Deleted document: {doc}", vi: "✅ Đã xóa tài liệu: {doc}" },
    NoActiveDocument => {
        en: "❗ No document selected. Please upload or select a document first.",
        vi: "❗ Chưa chọn tài liệu. Vui lòng tải lên hoặc chọn một tài liệu trước.",
    },

    // Analysis
    AnalyzeOptions => {
        en: "📝 <b>Analyze Document</b>: {doc}\n\nChoose an analysis type or type your own prompt:",
        vi: "📝 <b>Phân tích tài liệu</b>: {doc}\n\nChọn loại phân tích hoặc nhập yêu cầu của bạn:",
    },
    BtnSummarize => { en: "📝 Summarize", vi: "📝 Tóm tắt" },
    BtnKeyPoints => { en: "🔑 Key Points", vi: "🔑 Điểm chính" },
    BtnArguments => { en: "📊 Main Arguments", vi: "📊 Lập luận chính" },
    BtnData => { en: "📈 Data & Statistics", vi: "📈 Dữ liệu & Thống kê" },
    PromptSummarize => {
        en: "Summarize this document in a concise way, highlighting the most important information.",
        vi: "Tóm tắt tài liệu này một cách ngắn gọn, nhấn mạnh thông tin quan trọng nhất.",
    },
    PromptKeyPoints => {
        en: "Extract and list the key points from this document.",
        vi: "Trích xuất và liệt kê các điểm chính từ tài liệu này.",
    },
    PromptArguments => {
        en: "What are the main arguments or claims presented in this document?",
        vi: "Những lập luận hoặc tuyên bố chính được trình bày trong tài liệu này là gì?",
    },
    PromptData => {
        en: "Extract and organize any data, statistics, or numerical information from this document.",
        vi: "Trích xuất và tổ chức bất kỳ dữ liệu, thống kê, hoặc thông tin số nào từ tài liệu này.",
    },
    AskPrompt => {
        en: "❓ <b>Ask about</b>: {doc}\n\nType your question about this document.\n\nExamples:\n• What is the main conclusion?\n• Who are the key stakeholders mentioned?\n• What methodology was used?\n\nType /back to return to the main menu.",
        vi: "❓ <b>Hỏi về</b>: {doc}\n\nNhập câu hỏi của bạn về tài liệu này.\n\nVí dụ:\n• Kết luận chính là gì?\n• Những bên liên quan chính được đề cập là ai?\n• Phương pháp nào đã được sử dụng?\n\nGõ /back để quay lại menu chính.",
    },
    Analyzing => {
        en: "⏳ Analyzing document: {doc}...\n\nThis may take a minute depending on the size and complexity of your document.",
        vi: "⏳ Đang phân tích tài liệu: {doc}...\n\nQuá trình này có thể mất một phút tùy thuộc vào kích thước và độ phức tạp của tài liệu.",
    },
    AnalysisTitle => { en: "📝 <b>Analysis Results</b>", vi: "📝 <b>Kết quả phân tích</b>" },
    AnalysisError => {
        en: "❌ Error analyzing document: {error}\n\nPlease try again.",
        vi: "❌ Lỗi khi phân tích tài liệu: {error}\n\nVui lòng thử lại.",
    },
    BtnFollowUp => { en: "🔍 Ask Follow-up Question", vi: "🔍 Đặt câu hỏi tiếp theo" },
    BtnAskAnother => { en: "🔍 Ask Another Question", vi: "🔍 Đặt câu hỏi khác" },

    // Comparison
    NeedTwoDocuments => {
        en: "❗ You need at least 2 documents to compare. Please upload more documents.",
        vi: "❗ Bạn cần ít nhất 2 tài liệu để so sánh. Vui lòng tải lên thêm tài liệu.",
    },
    CompareSelection => {
        en: "🔄 <b>Compare Documents</b>\n\nSelected: {count}/2 documents\n\nSelect at least 2 documents to compare, then click 'Compare Selected':",
        vi: "🔄 <b>So sánh tài liệu</b>\n\nĐã chọn: {count}/2 tài liệu\n\nChọn ít nhất 2 tài liệu để so sánh, sau đó nhấp vào 'So sánh đã chọn':",
    },
    BtnCompareSelected => { en: "🔄 Compare Selected", vi: "🔄 So sánh đã chọn" },
    SelectAtLeastTwo => {
        en: "❗ Please select at least 2 documents to compare.",
        vi: "❗ Vui lòng chọn ít nhất 2 tài liệu để so sánh.",
    },
    CompareKinds => {
        en: "Selected documents:\n{docs}\n\nChoose comparison type:",
        vi: "Tài liệu đã chọn:\n{docs}\n\nChọn kiểu so sánh:",
    },
    BtnCompareGeneral => { en: "📊 General Comparison", vi: "📊 So sánh tổng quát" },
    BtnCompareDifferences => { en: "🔍 Key Differences", vi: "🔍 Điểm khác biệt" },
    BtnCompareCommon => { en: "🔗 Common Themes", vi: "🔗 Chủ đề chung" },
    BtnCompareData => { en: "📈 Data Comparison", vi: "📈 So sánh dữ liệu" },
    PromptCompareGeneral => {
        en: "Compare these documents and provide a general overview of their similarities and differences.",
        vi: "So sánh các tài liệu này và cung cấp tổng quan về điểm giống và khác nhau.",
    },
    PromptCompareDifferences => {
        en: "What are the key differences between these documents? Focus on contrasting viewpoints, methodologies, or conclusions.",
        vi: "Những điểm khác biệt chính giữa các tài liệu này là gì? Tập trung vào quan điểm, phương pháp, hoặc kết luận trái ngược.",
    },
    PromptCompareCommon => {
        en: "Identify and explain the common themes, arguments, or findings shared across these documents.",
        vi: "Xác định và giải thích các chủ đề, lập luận, hoặc phát hiện chung trong các tài liệu này.",
    },
    PromptCompareData => {
        en: "Compare any data, statistics, or numerical information presented in these documents. Create a table if appropriate.",
        vi: "So sánh bất kỳ dữ liệu, thống kê, hoặc thông tin số nào được trình bày trong các tài liệu này. Tạo bảng nếu thích hợp.",
    },
    Comparing => {
        en: "⏳ Comparing documents...\n\nThis may take a minute depending on the size and complexity of your documents.",
        vi: "⏳ Đang so sánh tài liệu...\n\nQuá trình này có thể mất một phút tùy thuộc vào kích thước và độ phức tạp của tài liệu.",
    },
    ComparisonTitle => { en: "📊 <b>Comparison Results</b>", vi: "📊 <b>Kết quả so sánh</b>" },
    ComparisonError => {
        en: "❌ Error comparing documents: {error}\n\nPlease try again.",
        vi: "❌ Lỗi khi so sánh tài liệu: {error}\n\nVui lòng thử lại.",
    },

    // Results and errors
    WhatNext => { en: "What would you like to do next?", vi: "Bạn muốn làm gì tiếp theo?" },
    TranslationFailed => { en: "(Translation failed)", vi: "(Dịch thất bại)" },
    GenericError => {
        en: "❌ Sorry, an error occurred while processing your request.\n\nPlease try again or type /start to restart the bot.",
        vi: "❌ Xin lỗi, đã xảy ra lỗi khi xử lý yêu cầu của bạn.\n\nVui lòng thử lại hoặc gõ /start để khởi động lại bot.",
    },
}

impl AnalysisKind {
    /// Button caption key
    #[must_use]
    pub const fn button(self) -> Msg {
        match self {
            Self::Summarize => Msg::BtnSummarize,
            Self::KeyPoints => Msg::BtnKeyPoints,
            Self::Arguments => Msg::BtnArguments,
            Self::Data => Msg::BtnData,
        }
    }

    /// Prompt sent to the backend
    #[must_use]
    pub const fn prompt(self) -> Msg {
        match self {
            Self::Summarize => Msg::PromptSummarize,
            Self::KeyPoints => Msg::PromptKeyPoints,
            Self::Arguments => Msg::PromptArguments,
            Self::Data => Msg::PromptData,
        }
    }
}

impl CompareKind {
    /// Button caption key
    #[must_use]
    pub const fn button(self) -> Msg {
        match self {
            Self::General => Msg::BtnCompareGeneral,
            Self::Differences => Msg::BtnCompareDifferences,
            Self::Common => Msg::BtnCompareCommon,
            Self::Data => Msg::BtnCompareData,
        }
    }

    /// Prompt sent to the backend
    #[must_use]
    pub const fn prompt(self) -> Msg {
        match self {
            Self::General => Msg::PromptCompareGeneral,
            Self::Differences => Msg::PromptCompareDifferences,
            Self::Common => Msg::PromptCompareCommon,
            Self::Data => Msg::PromptCompareData,
        }
    }
}

/// Fills a template for an HTML message body; values are escaped.
#[must_use]
pub fn render(language: Language, msg: Msg, args: &[(&str, &str)]) -> String {
    fill(msg.text(language), args, |value| {
        html_escape::encode_text(value).into_owned()
    })
}

/// Fills a template for a button caption; values are inserted as is.
#[must_use]
pub fn label(language: Language, msg: Msg, args: &[(&str, &str)]) -> String {
    fill(msg.text(language), args, ToString::to_string)
}

fn fill(template: &str, args: &[(&str, &str)], encode: impl Fn(&str) -> String) -> String {
    // Single pass so substituted values are never re-scanned for placeholders
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let substituted = after.find('}').and_then(|end| {
            let key = &after[..end];
            args.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (encode(value), end))
        });
        match substituted {
            Some((value, end)) => {
                out.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
