//! 子表单页面的候选定位链
//!
//! 类名来自目标应用的编译产物，随发版变化；修改时只需调整这里的链。

use crate::infrastructure::{LocatorSpec, Predicate};

const CHANNEL_NAME: &str = "Work Orders & PMs";
const NEW_SUB_FORM: &str = "New Sub Form";

/// 创建子表单流程中用到的全部控件
#[derive(Debug, Clone)]
pub struct SubFormSelectors {
    /// 侧边栏中的频道
    pub sidebar_channel: LocatorSpec,
    /// 顶栏中的频道名（打开频道菜单）
    pub header_channel: LocatorSpec,
    /// 频道菜单中的 "Sub Forms"
    pub sub_forms: LocatorSpec,
    pub new_button: LocatorSpec,
    /// 新建对话框中的 "Upload a PDF" 模式
    pub upload_mode: LocatorSpec,
    /// 预填 "New Sub Form" 的名称输入框
    pub name_input: LocatorSpec,
    pub description_input: LocatorSpec,
    /// 上传区域（文本节点往上三层才是可点击的容器）
    pub upload_trigger: LocatorSpec,
    pub next_button: LocatorSpec,
    /// 远端构建中的提示
    pub building_indicator: LocatorSpec,
    pub back_button: LocatorSpec,
}

impl Default for SubFormSelectors {
    fn default() -> Self {
        let new_sub_form_value = format!("[value=\"{}\"]", NEW_SUB_FORM);

        Self {
            sidebar_channel: LocatorSpec::new(
                "sidebar-channel",
                Predicate::css("div.css-901oao.css-cens5h").with_text(CHANNEL_NAME),
            )
            .or(Predicate::css("div.css-cens5h").with_text(CHANNEL_NAME)),

            header_channel: LocatorSpec::new(
                "header-channel",
                Predicate::test_id("main-header-channel-name").with_text(CHANNEL_NAME),
            ),

            sub_forms: LocatorSpec::new(
                "sub-forms",
                Predicate::css("div.css-901oao")
                    .with_text("Sub Forms")
                    .with_descendant_text("Manage the sub forms"),
            ),

            new_button: LocatorSpec::new(
                "new-button",
                Predicate::css("div.css-901oao.r-1b43r93").with_text("New"),
            )
            .or(Predicate::css("div.css-901oao").with_text("New"))
            .or(Predicate::css("div[class*=\"r-1b43r93\"]").with_text("New"))
            .or(Predicate::css("button").with_text("New"))
            .or(Predicate::css("div").with_text("New")),

            upload_mode: LocatorSpec::new(
                "upload-mode",
                Predicate::css(
                    "div.css-901oao.r-1q9qjxj.r-1q02xf1.r-ubezar.r-13uqrnb.r-1it3c9n.r-afbznj.r-rjixqe.r-5lyqn3",
                )
                .with_text("Upload a PDF"),
            )
            .or(Predicate::css("div.css-901oao.r-1q9qjxj").with_text("Upload a PDF"))
            .or(Predicate::css("div.css-901oao").with_text("Upload a PDF"))
            .or(Predicate::css("div").with_text("Upload a PDF")),

            name_input: LocatorSpec::new(
                "name-input",
                Predicate::css(format!("input.css-11aywtz{}", new_sub_form_value)),
            )
            .or(Predicate::css(format!("input[maxlength=\"64\"]{}", new_sub_form_value)))
            .or(Predicate::css("input[type=\"text\"][maxlength=\"64\"]"))
            .or(Predicate::css("input.css-11aywtz"))
            .or(Predicate::css("input[type=\"text\"]")),

            description_input: LocatorSpec::new(
                "description-input",
                Predicate::css("textarea[placeholder*=\"description\" i]"),
            )
            .or(Predicate::css("input[placeholder*=\"description\" i]"))
            .or(Predicate::css("textarea")),

            upload_trigger: LocatorSpec::new(
                "upload-trigger",
                Predicate::css("div.css-901oao.css-cens5h")
                    .with_text("Upload a PDF")
                    .ancestor(3),
            ),

            next_button: LocatorSpec::new(
                "next-button",
                Predicate::css("div.css-901oao.r-1q02xf1.r-1b43r93").with_text("Next"),
            ),

            building_indicator: LocatorSpec::new(
                "building-indicator",
                Predicate::css("div.css-901oao").with_text("Building your form. This may take a minute"),
            ),

            back_button: LocatorSpec::new("back-button", Predicate::test_id("modal-back-button")),
        }
    }
}
