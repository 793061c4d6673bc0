use anyhow::{anyhow, Result};

/// Return the built-in test domains.
///
/// A mix of popular mainland China sites and global sites, so resolvers on
/// both sides of the border are exercised.
pub fn default_domains() -> Vec<String> {
	vec![
		// Mainland China
		"douyin.com",
		"kuaishou.com",
		"baidu.com",
		"taobao.com",
		"mi.com",
		"aliyun.com",
		"bilibili.com",
		"jd.com",
		"qq.com",
		"ithome.com",
		"hupu.com",
		"feishu.cn",
		"sohu.com",
		"163.com",
		"sina.com",
		"weibo.com",
		"xiaohongshu.com",
		"douban.com",
		"zhihu.com",
		"youku.com",
		"youdao.com",
		"mp.weixin.qq.com",
		"iqiyi.com",
		"v.qq.com",
		"y.qq.com",
		"www.ctrip.com",
		"autohome.com.cn",
		// Global
		"google.com",
		"facebook.com",
		"x.com",
		"github.com",
		"youtube.com",
		"chatgpt.com",
		"apple.com",
		"bing.com",
		"tiktok.com",
	].into_iter().map(String::from).collect()
}

/// Split a comma-separated domain list.
///
/// Whitespace around entries is trimmed and empty entries are dropped.
pub fn parse_domain_list(input: &str) -> Vec<String> {
	input.split(',')
		.map(str::trim)
		.filter(|d| !d.is_empty())
		.map(String::from)
		.collect()
}

/// Read domains from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	let domains: Vec<String> = content.lines()
		.map(|line| line.trim().to_string())
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.collect();
	Ok(domains)
}
