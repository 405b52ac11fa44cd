//! 查询参数模块
//!
//! 封装已解码的 HTTP 查询字符串键值对，识别保留键与
//! 方括号比较键（如 `age[gte]=20`），供查询构建器消费

/// 保留键列表，这些键由分页/排序/投影/搜索阶段消费，
/// 不参与字段过滤
pub const RESERVED_KEYS: [&str; 5] = ["page", "limit", "sort", "fields", "search"];

/// 已解码的查询参数集合
///
/// 保留插入顺序；同名键可重复出现（`?role=a&role=b`），
/// 单值读取时以最后一次出现为准
#[derive(Clone, Debug, Default)]
pub struct QueryParams {
    entries: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从键值对序列构建参数集合
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 追加一个键值对（允许重复键）
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// 读取单值，同名键取最后一次出现
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 读取全部同名值，按出现顺序
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// 遍历全部键值对，按插入顺序
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 判断键是否为保留键（精确匹配，`page[gte]` 不算）
    pub fn is_reserved(key: &str) -> bool {
        RESERVED_KEYS.contains(&key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// 拆分方括号键：`age[gte]` -> (`age`, Some(`gte`))，
/// 裸键 `age` -> (`age`, None)
///
/// 只识别 `field[token]` 形式；其余形状原样作为字段名返回
pub fn split_bracket_key(key: &str) -> (&str, Option<&str>) {
    if let Some(open) = key.find('[') {
        if let Some(stripped) = key[open + 1..].strip_suffix(']') {
            let field = &key[..open];
            if !field.is_empty() && !stripped.is_empty() && !stripped.contains('[') {
                return (field, Some(stripped));
            }
        }
    }
    (key, None)
}
