/// Sentinel accepted in configuration for "no region filter"
pub const ALL_REGIONS: &str = "all";

/// Province names and the codes the search endpoint uses in `region=custom:<code>:1000`
const PROVINCE_CODES: &[(&str, &str)] = &[
    ("安徽", "34"),
    ("北京", "11"),
    ("重庆", "50"),
    ("福建", "35"),
    ("甘肃", "62"),
    ("广东", "44"),
    ("广西", "45"),
    ("贵州", "52"),
    ("海南", "46"),
    ("河北", "13"),
    ("黑龙江", "23"),
    ("河南", "41"),
    ("湖北", "42"),
    ("湖南", "43"),
    ("内蒙古", "15"),
    ("江苏", "32"),
    ("江西", "36"),
    ("吉林", "22"),
    ("辽宁", "21"),
    ("宁夏", "64"),
    ("青海", "63"),
    ("山西", "14"),
    ("山东", "37"),
    ("上海", "31"),
    ("四川", "51"),
    ("天津", "12"),
    ("西藏", "54"),
    ("新疆", "65"),
    ("云南", "53"),
    ("浙江", "33"),
    ("陕西", "61"),
    ("台湾", "71"),
    ("香港", "81"),
    ("澳门", "82"),
    ("海外", "400"),
    ("其他", "100"),
];

/// Looks up the endpoint's province code for a region name
///
/// # Examples
///
/// ```
/// use weibo_search::query::province_code;
///
/// assert_eq!(province_code("北京"), Some("11"));
/// assert_eq!(province_code("Atlantis"), None);
/// ```
pub fn province_code(name: &str) -> Option<&'static str> {
    let name = name.trim();
    PROVINCE_CODES
        .iter()
        .find(|(province, _)| *province == name)
        .map(|(_, code)| *code)
}

/// Returns true if the value means "every region"
pub fn is_all_regions(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case(ALL_REGIONS) || name == "全部"
}
