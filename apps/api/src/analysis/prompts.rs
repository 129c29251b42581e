// CV analysis prompt templates.
// One template per (language, job description present) pair.
// Each lists the sections and the exact JSON keys the model must use.

/// System instruction for every analysis call.
pub const ANALYSIS_SYSTEM: &str = "You are a professional CV analysis assistant that \
specializes in parsing and analyzing resumes. You provide structured, helpful feedback \
on how to improve CVs. You MUST respond with a single valid JSON object only. \
Do NOT use markdown code fences. Do NOT include any text outside the JSON object.";

/// English, CV only. Replace `{cv_text}`.
pub const EN_PROMPT: &str = r#"This is a request to analyze a resume/CV. Please evaluate this CV and provide an analysis in the following structured format:

1. Overall Impression: A 2-3 sentence summary evaluation of the overall quality of the CV.

2. ATS Compatibility Score: A numerical assessment on a scale of 1-100 of how well the CV would pass through an Applicant Tracking System (ATS). Higher is better.

3. Strengths: 3-5 key strengths of the CV - things the candidate is doing well.

4. Areas for Improvement: 3-5 areas where the CV could be improved - things the candidate should work on.

5. Recommendations: 3-5 concrete, actionable recommendations to improve the CV.

6. Keyword Suggestions: Suggest 5-10 relevant keywords that the candidate might consider including.

Provide your response in structured JSON format with the keys: overall_impression, ats_score (numerical), strengths (array), areas_for_improvement (array), recommendations (array), and keyword_suggestions (array).

Here is the CV text:

{cv_text}"#;

/// English, CV against a job description. Replace `{cv_text}` and `{job_description}`.
pub const EN_JOB_PROMPT: &str = r#"This is a request to analyze a resume/CV against a job description. Please evaluate this CV and provide an analysis in the following structured format:

1. Overall Impression: A 2-3 sentence summary evaluation of the overall quality of the CV.

2. ATS Compatibility Score: A numerical assessment on a scale of 1-100 of how well the CV would pass through an Applicant Tracking System (ATS). Higher is better.

3. Job Match Score: A numerical assessment on a scale of 1-100 of how well the CV matches the provided job description. Higher is better.

4. Strengths: 3-5 key strengths of the CV - things the candidate is doing well.

5. Areas for Improvement: 3-5 areas where the CV could be improved - things the candidate should work on.

6. Job-Specific Recommendations: 3-5 concrete, actionable recommendations to improve the CV specifically for this job.

7. Keyword Suggestions: Suggest 5-10 relevant keywords from the job description that the candidate might consider including.

Provide your response in structured JSON format with the keys: overall_impression, ats_score (numerical), job_match_score (numerical), strengths (array), areas_for_improvement (array), job_specific_recommendations (array), and keyword_suggestions (array).

Here is the CV text:

{cv_text}

And the job description:

{job_description}"#;

/// Turkish, CV only. Replace `{cv_text}`.
pub const TR_PROMPT: &str = r#"Bu bir özgeçmişi analiz etmen için bir istektir. Bu CV'yi değerlendir ve aşağıdaki yapılandırılmış biçimde bir analiz sağla:

1. Genel İzlenim: CV'nin genel kalitesi hakkında 2-3 cümlelik bir özet değerlendirme.

2. ATS Uyumluluğu Puanı: CV'nin bir Başvuru Takip Sisteminden (ATS) ne kadar iyi geçeceğinin 1-100 arası bir sayısal değerlendirmesi. Daha yüksek puan daha iyidir.

3. Güçlü Yönler: CV'nin 3-5 önemli güçlü yönü - adayın iyi yaptığı şeyler.

4. İyileştirme Alanları: CV'nin 3-5 iyileştirme alanı - adayın geliştirmesi gereken şeyler.

5. Öneriler: CV'yi geliştirmek için 3-5 somut, uygulanabilir öneri.

6. Anahtar Kelime Önerileri: Adayın dahil etmeyi düşünmesi gereken 5-10 ilgili anahtar kelime öner.

Yanıtını şu anahtarlarla yapılandırılmış JSON formatında ver: overall_impression, ats_score (sayısal), strengths (dizi), areas_for_improvement (dizi), recommendations (dizi) ve keyword_suggestions (dizi).

İşte CV metni:

{cv_text}"#;

/// Turkish, CV against a job description. Replace `{cv_text}` and `{job_description}`.
pub const TR_JOB_PROMPT: &str = r#"Bu bir özgeçmişi ve iş tanımını karşılaştırarak analiz etmen için bir istektir. Bu CV'yi değerlendir ve aşağıdaki yapılandırılmış biçimde bir analiz sağla:

1. Genel İzlenim: CV'nin genel kalitesi hakkında 2-3 cümlelik bir özet değerlendirme.

2. ATS Uyumluluğu Puanı: CV'nin bir Başvuru Takip Sisteminden (ATS) ne kadar iyi geçeceğinin 1-100 arası bir sayısal değerlendirmesi. Daha yüksek puan daha iyidir.

3. İş Uyum Puanı: CV'nin verilen iş tanımına ne kadar iyi uyduğunun 1-100 arası bir sayısal değerlendirmesi. Daha yüksek puan daha iyidir.

4. Güçlü Yönler: CV'nin 3-5 önemli güçlü yönü - adayın iyi yaptığı şeyler.

5. İyileştirme Alanları: CV'nin 3-5 iyileştirme alanı - adayın geliştirmesi gereken şeyler.

6. İş Odaklı Öneriler: CV'yi bu belirli iş için daha iyi hale getirmek için 3-5 somut, uygulanabilir öneri.

7. Anahtar Kelime Önerileri: Adayın bu iş için dahil etmeyi düşünmesi gereken 5-10 ilgili anahtar kelime öner.

Yanıtını şu anahtarlarla yapılandırılmış JSON formatında ver: overall_impression, ats_score (sayısal), job_match_score (sayısal), strengths (dizi), areas_for_improvement (dizi), job_specific_recommendations (dizi) ve keyword_suggestions (dizi).

İşte CV metni:

{cv_text}

Ve iş tanımı:

{job_description}"#;

/// Substitutes `{name}` placeholders in a single pass, so placeholder-like
/// text inside a substituted value is never expanded.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let matched = vars.iter().find_map(|(name, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (value, after))
        });
        match matched {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
