//! User-facing Uzbek copy.

pub const APP_NAME: &str = "LegalAI";
pub const APP_TAGLINE: &str = "Virtual Yurist";

pub const ERROR_REPLY: &str = "Uzr, texnik xatolik yuz berdi. Iltimos qaytadan urinib ko'ring.";

pub const WELCOME_TITLE: &str = "LegalAI ga Xush Kelibsiz";
pub const WELCOME_BODY: &str =
    "O'zbekiston qonunchiligi bo'yicha sun'iy intellekt yordamchisi.\nSavol bering yoki hujjat yuklang.";

pub const INPUT_PLACEHOLDER: &str = "Huquqiy savolingizni yozing...";
pub const FOOTER_NOTICE: &str = "LegalAI xato qilishi mumkin. Muhim ma'lumotlarni tekshiring.";
pub const ATTACHMENT_LOADED: &str = "Rasm yuklandi";
pub const SOURCES_HEADING: &str = "Manbalar";

pub const DISCLAIMER_TITLE: &str = "Muhim Ogohlantirish";
pub const DISCLAIMER_TEXT: &str = "LegalAI sun'iy intellekt asosida ishlaydigan yordamchi bo'lib, malakali advokat maslahatining o'rnini bosa olmaydi.\n\nBerilgan javoblar umumiy ma'lumot xarakteriga ega va xato bo'lishi mumkin. Muhim qarorlar qabul qilishdan oldin rasmiy manbalar va litsenziyaga ega yurist bilan maslahatlashing.";
pub const DISCLAIMER_ACCEPT: &str = "Tushundim va Qabul qilaman";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Siz LegalAI, O'zbekiston Respublikasi qonunchiligi bo'yicha ixtisoslashgan virtual yuristsiz.\n\
Foydalanuvchiga har doim o'zbek tilida, aniq va tushunarli javob bering.\n\
Javoblaringizni amaldagi kodekslar va qonunlarga (Fuqarolik, Mehnat, Oila, Jinoyat kodekslari va boshqalar) tayangan holda asoslang, tegishli moddalarni ko'rsating.\n\
Hujjat yoki shartnoma rasmi yuborilsa, uni tahlil qilib, xavfli bandlar va yetishmayotgan himoya choralarini sanab bering.\n\
Ishonchingiz komil bo'lmagan joyda buni ochiq ayting va malakali advokatga murojaat qilishni tavsiya qiling.";

/// A canned prompt offered on the empty chat screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub id: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const SUGGESTIONS: [Suggestion; 3] = [
    Suggestion {
        id: "contract",
        label: "Shartnoma Tahlili",
        prompt: "Menda shartnoma (rasmi) bor, uni O'zbekiston Fuqarolik kodeksiga muvofiq xavfli bandlar va yetishmayotgan himoya choralarini tekshirib bering.",
    },
    Suggestion {
        id: "divorce",
        label: "Oila Huquqi",
        prompt: "O'zbekistonda agar umumiy farzandlar bo'lsa, ajrashish tartibi qanday? Mulk qanday taqsimlanadi?",
    },
    Suggestion {
        id: "labor",
        label: "Mehnat Nizosi",
        prompt: "Ish beruvchim meni ogohlantirishsiz ishdan bo'shatdi. Mehnat kodeksi bo'yicha qanday kompensatsiya olishga haqliman?",
    },
];
